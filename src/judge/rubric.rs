//! Bundled judging rubrics
//!
//! Each rubric evaluates the service agent along one dimension. The
//! catalog order is stable and drives the reporting order of mixture
//! verdicts.

/// One judging dimension.
#[derive(Debug, Clone, Copy)]
pub struct Rubric {
    pub name: &'static str,
    /// What this judge pays attention to, spliced into the prompt.
    pub focus: &'static str,
}

/// The bundled rubric catalog, in reporting order.
pub const RUBRICS: &[Rubric] = &[
    Rubric {
        name: "empathy",
        focus: "how well the service representative acknowledges the \
                customer's frustration, validates their concerns, and \
                adapts tone to the customer's emotional state",
    },
    Rubric {
        name: "accuracy",
        focus: "whether the information, policies, and product guidance \
                the representative gives are specific, internally \
                consistent, and plausible for a home-improvement retailer",
    },
    Rubric {
        name: "resolution",
        focus: "whether the customer's actual problem gets resolved or a \
                concrete next step is agreed, and how efficiently the \
                representative drives toward that outcome",
    },
    Rubric {
        name: "professionalism",
        focus: "courtesy, clarity, appropriate formality, and whether the \
                representative stays composed and on-policy throughout",
    },
];

/// Rubric used for single-pass judging: an overall assessment rather
/// than one dimension.
pub const OVERALL_RUBRIC: Rubric = Rubric {
    name: "overall",
    focus: "overall quality of the customer service interaction: empathy, \
            accuracy of information, progress toward resolution, and \
            professionalism",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_is_stable() {
        let names: Vec<&str> = RUBRICS.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["empathy", "accuracy", "resolution", "professionalism"]
        );
    }
}
