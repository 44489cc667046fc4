use crate::models::StudentRecord;

pub const HIGH_AI_RELIANCE: &str =
    "High AI reliance detected — recommend writing workshops and guided assignments to rebuild skill.";
pub const LOW_MOTIVATION: &str =
    "Low autonomous motivation — consider autonomy-supportive tasks and formative feedback.";
pub const PEER_RELIANCE: &str =
    "Strong peer reliance — promote collaborative but independent tasks; monitor group dependency.";
pub const WEAK_PRIOR_GRADES: &str =
    "Prior GWA above 2.0 — recommend guided study plans and regular academic check-ins.";
pub const NO_CONCERNS: &str = "No immediate concerns; encourage balanced AI use only.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecommendationRules {
    /// Adds the prior-GWA rule after the three core rules.
    pub extended: bool,
}

/// Advisories for one student, in rule order. Never empty.
pub fn recommend(record: &StudentRecord, rules: RecommendationRules) -> Vec<&'static str> {
    let mut advisories = Vec::new();

    if record.ai_dependency_index > 6.0 {
        advisories.push(HIGH_AI_RELIANCE);
    }
    if record.motivation_score < 4.0 {
        advisories.push(LOW_MOTIVATION);
    }
    if record.environment_score > 5.0 {
        advisories.push(PEER_RELIANCE);
    }
    if rules.extended && record.prior_gwa > 2.0 {
        advisories.push(WEAK_PRIOR_GRADES);
    }

    if advisories.is_empty() {
        advisories.push(NO_CONCERNS);
    }
    advisories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::row;
    use crate::normalize::normalize;
    use pretty_assertions::assert_eq;

    fn scored(ai: &str, mot: &str, env: &str, gwa: &str) -> StudentRecord {
        normalize(row(&[
            ("Student_ID", "S-9"),
            ("AI_Dependency_Index", ai),
            ("Motivation_Score", mot),
            ("Environment_Score", env),
            ("Prior_GWA", gwa),
        ]))
    }

    #[test]
    fn all_core_rules_fire_in_declaration_order() {
        let rules = RecommendationRules::default();
        let recs = recommend(&scored("7", "2", "6", "1.5"), rules);
        assert_eq!(recs, vec![HIGH_AI_RELIANCE, LOW_MOTIVATION, PEER_RELIANCE]);
    }

    #[test]
    fn neutral_scores_get_the_default_advisory() {
        let rules = RecommendationRules::default();
        let recs = recommend(&scored("3", "5", "3", "1.5"), rules);
        assert_eq!(recs, vec![NO_CONCERNS]);
    }

    #[test]
    fn thresholds_are_strict() {
        let rules = RecommendationRules { extended: true };
        let recs = recommend(&scored("6", "4", "5", "2.0"), rules);
        assert_eq!(recs, vec![NO_CONCERNS]);
    }

    #[test]
    fn extended_rule_only_applies_when_enabled() {
        let record = scored("3", "5", "3", "2.75");
        let core = RecommendationRules::default();
        assert_eq!(recommend(&record, core), vec![NO_CONCERNS]);
        assert_eq!(
            recommend(&record, RecommendationRules { extended: true }),
            vec![WEAK_PRIOR_GRADES]
        );
    }

    #[test]
    fn missing_scores_count_as_zero() {
        // Motivation defaults to 0, which is below the coaching cutoff.
        let record = normalize(row(&[("Student_ID", "S-10")]));
        let rules = RecommendationRules::default();
        assert_eq!(recommend(&record, rules), vec![LOW_MOTIVATION]);
    }
}
