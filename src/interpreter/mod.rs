//! Deterministic mapping from classifier output to user-facing content
//!
//! Nothing here performs I/O. Every derived value (findings, recommendations,
//! products, summary) is recomputed from the `ClassificationResult` on demand.

pub mod catalog;

use crate::{
    config::InterpretationThresholds,
    types::{AnalysisData, AnalysisSummary, ClassificationResult, Finding, Product, Severity},
};

/// Pure interpreter over classification results
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultInterpreter {
    thresholds: InterpretationThresholds,
}

/// Probability in [0, 1] to an integer percent, half away from zero
#[must_use]
pub fn to_percent(probability: f64) -> u8 {
    (probability.clamp(0.0, 1.0) * 100.0).round() as u8
}

impl ResultInterpreter {
    #[must_use]
    pub fn new(thresholds: InterpretationThresholds) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub fn thresholds(&self) -> &InterpretationThresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn severity(&self, probability: f64) -> Severity {
        if probability >= self.thresholds.high_severity {
            Severity::High
        } else if probability >= self.thresholds.medium_severity {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// One finding per prediction, sorted by descending percent
    ///
    /// Equal percents keep `class_names` order; conditions missing from
    /// `class_names` follow in name order.
    #[must_use]
    pub fn to_findings(&self, result: &ClassificationResult) -> Vec<Finding> {
        let mut ordered: Vec<(&str, f64)> = result
            .class_names
            .iter()
            .filter_map(|name| {
                result
                    .predictions
                    .get(name)
                    .map(|p| (name.as_str(), *p))
            })
            .collect();

        // Duplicate class names would otherwise emit the same finding twice
        let mut seen = std::collections::HashSet::new();
        ordered.retain(|(name, _)| seen.insert(*name));

        // BTreeMap iteration is already name-ordered
        for (name, probability) in &result.predictions {
            if !seen.contains(name.as_str()) {
                ordered.push((name.as_str(), *probability));
            }
        }

        let mut findings: Vec<Finding> = ordered
            .into_iter()
            .map(|(condition, probability)| Finding {
                condition: condition.to_string(),
                probability: to_percent(probability),
                severity: self.severity(probability),
            })
            .collect();

        // `sort_by` is stable, which preserves the tie-break order above
        findings.sort_by(|a, b| b.probability.cmp(&a.probability));
        findings
    }

    /// Advisory flag for clinical-caution UI; never blocks a report
    #[must_use]
    pub fn meets_confidence_threshold(&self, result: &ClassificationResult) -> bool {
        result.confidence >= self.thresholds.confidence
    }

    #[must_use]
    pub fn recommendations_for(condition: &str) -> Vec<String> {
        catalog::lookup(condition)
            .recommendations
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    #[must_use]
    pub fn products_for(condition: &str) -> Vec<Product> {
        catalog::lookup(condition)
            .products
            .iter()
            .map(|p| Product {
                name: p.name.to_string(),
                brand: p.brand.to_string(),
                rating: p.rating,
                price: p.price.to_string(),
            })
            .collect()
    }

    #[must_use]
    pub fn summarize(&self, result: &ClassificationResult) -> AnalysisSummary {
        AnalysisSummary {
            overall: format!("{} Detected", result.primary_condition),
            primary_condition: result.primary_condition.clone(),
            confidence: to_percent(result.confidence),
            findings: self.to_findings(result),
            recommendations: Self::recommendations_for(&result.primary_condition),
            products: Self::products_for(&result.primary_condition),
            meets_threshold: self.meets_confidence_threshold(result),
        }
    }

    /// Payload for the report endpoint
    #[must_use]
    pub fn analysis_data(result: &ClassificationResult) -> AnalysisData {
        AnalysisData {
            predictions: result.predictions.clone(),
            primary_condition: result.primary_condition.clone(),
            confidence: result.confidence,
            recommendations: Self::recommendations_for(&result.primary_condition),
            products: Self::products_for(&result.primary_condition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn result(predictions: &[(&str, f64)], class_names: &[&str], confidence: f64) -> ClassificationResult {
        let map: BTreeMap<String, f64> = predictions
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect();
        let primary = predictions
            .iter()
            .fold(("", f64::MIN), |best, (k, v)| if *v > best.1 { (*k, *v) } else { best })
            .0
            .to_string();
        ClassificationResult {
            predictions: map,
            primary_condition: primary,
            confidence,
            class_names: class_names.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn finding(condition: &str, probability: u8, severity: Severity) -> Finding {
        Finding {
            condition: condition.to_string(),
            probability,
            severity,
        }
    }

    #[test]
    fn test_findings_sorted_descending() {
        let interpreter = ResultInterpreter::default();
        let r = result(&[("A", 0.2), ("B", 0.9), ("C", 0.5)], &["A", "B", "C"], 0.9);
        assert_eq!(
            interpreter.to_findings(&r),
            vec![
                finding("B", 90, Severity::High),
                finding("C", 50, Severity::Medium),
                finding("A", 20, Severity::Low),
            ]
        );
    }

    #[test]
    fn test_ties_follow_class_name_order() {
        let interpreter = ResultInterpreter::default();
        let r = result(
            &[("Rosacea", 0.3), ("Acne", 0.3), ("Eczemaa", 0.4)],
            &["Rosacea", "Eczemaa", "Acne"],
            0.4,
        );
        let names: Vec<String> = interpreter
            .to_findings(&r)
            .into_iter()
            .map(|f| f.condition)
            .collect();
        assert_eq!(names, vec!["Eczemaa", "Rosacea", "Acne"]);
    }

    #[test]
    fn test_ties_after_rounding_follow_class_name_order() {
        let interpreter = ResultInterpreter::default();
        // 0.304 and 0.296 both round to 30
        let r = result(&[("Acne", 0.296), ("Rosacea", 0.304)], &["Acne", "Rosacea"], 0.4);
        let findings = interpreter.to_findings(&r);
        assert_eq!(findings[0].condition, "Acne");
        assert_eq!(findings[0].probability, 30);
        assert_eq!(findings[1].probability, 30);
    }

    #[test]
    fn test_conditions_outside_class_names_are_kept() {
        let interpreter = ResultInterpreter::default();
        let r = result(&[("Zeta", 0.1), ("Alpha", 0.1), ("Acne", 0.1)], &["Acne"], 0.1);
        let names: Vec<String> = interpreter
            .to_findings(&r)
            .into_iter()
            .map(|f| f.condition)
            .collect();
        assert_eq!(names, vec!["Acne", "Alpha", "Zeta"]);
    }

    #[test]
    fn test_severity_band_boundaries() {
        let interpreter = ResultInterpreter::default();
        assert_eq!(interpreter.severity(0.7), Severity::High);
        assert_eq!(interpreter.severity(0.6999), Severity::Medium);
        assert_eq!(interpreter.severity(0.4), Severity::Medium);
        assert_eq!(interpreter.severity(0.3999), Severity::Low);
        assert_eq!(interpreter.severity(0.0), Severity::Low);
    }

    #[test]
    fn test_confidence_threshold_boundary() {
        let interpreter = ResultInterpreter::default();
        let mut r = result(&[("Acne", 0.7)], &["Acne"], 0.7);
        assert!(interpreter.meets_confidence_threshold(&r));
        r.confidence = 0.699;
        assert!(!interpreter.meets_confidence_threshold(&r));
    }

    #[test]
    fn test_custom_thresholds() {
        let interpreter = ResultInterpreter::new(InterpretationThresholds {
            high_severity: 0.9,
            medium_severity: 0.5,
            confidence: 0.95,
        });
        assert_eq!(interpreter.severity(0.8), Severity::Medium);
        let r = result(&[("Acne", 0.9)], &["Acne"], 0.9);
        assert!(!interpreter.meets_confidence_threshold(&r));
    }

    #[test]
    fn test_unknown_condition_fallbacks() {
        assert_eq!(
            ResultInterpreter::recommendations_for("UnknownCondition"),
            vec![
                "Consult with a healthcare professional",
                "Monitor for any changes in symptoms",
                "Maintain good skincare practices",
            ]
        );
        let products = ResultInterpreter::products_for("UnknownCondition");
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].name, "Hydrating Daily Moisturizer");
        assert_eq!(products[0].brand, "CeraVe");
    }

    #[test]
    fn test_summary() {
        let interpreter = ResultInterpreter::default();
        let r = result(&[("Acne", 0.82), ("Rosacea", 0.31)], &["Acne", "Rosacea"], 0.82);
        let summary = interpreter.summarize(&r);
        assert_eq!(summary.overall, "Acne Detected");
        assert_eq!(summary.confidence, 82);
        assert!(summary.meets_threshold);
        assert_eq!(
            summary.findings,
            vec![
                finding("Acne", 82, Severity::High),
                finding("Rosacea", 31, Severity::Low),
            ]
        );
        assert_eq!(summary.recommendations, ResultInterpreter::recommendations_for("Acne"));
        assert_eq!(summary.recommendations.len(), 4);
    }

    #[test]
    fn test_analysis_data_payload() {
        let r = result(&[("Rosacea", 0.55), ("Acne", 0.45)], &["Acne", "Rosacea"], 0.55);
        let data = ResultInterpreter::analysis_data(&r);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["primary_condition"], "Rosacea");
        assert_eq!(json["predictions"]["Acne"], 0.45);
        assert_eq!(json["recommendations"].as_array().unwrap().len(), 4);
        assert_eq!(json["products"][0]["brand"], "La Roche-Posay");
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(to_percent(0.826), 83);
        assert_eq!(to_percent(0.004), 0);
        assert_eq!(to_percent(1.0), 100);
        assert_eq!(to_percent(1.2), 100);
    }
}
