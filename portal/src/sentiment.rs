use serde::Serialize;

use crate::storage::FeedbackRecord;

/// Word entries as (token, polarity, subjectivity). Polarity in [-1, 1],
/// subjectivity in [0, 1]. Small fixed lexicon tuned for campus feedback.
const LEXICON: &[(&str, f64, f64)] = &[
    // positive
    ("amazing", 0.75, 0.9),
    ("awesome", 0.8, 0.9),
    ("best", 0.9, 0.6),
    ("better", 0.4, 0.5),
    ("brilliant", 0.8, 0.85),
    ("clean", 0.4, 0.45),
    ("clear", 0.35, 0.4),
    ("comfortable", 0.5, 0.6),
    ("convenient", 0.45, 0.5),
    ("delicious", 0.7, 0.85),
    ("easy", 0.4, 0.55),
    ("effective", 0.5, 0.55),
    ("efficient", 0.5, 0.55),
    ("engaging", 0.55, 0.65),
    ("enjoy", 0.5, 0.6),
    ("enjoyable", 0.55, 0.65),
    ("enjoyed", 0.5, 0.6),
    ("excellent", 0.85, 0.9),
    ("fair", 0.35, 0.55),
    ("fantastic", 0.8, 0.9),
    ("fast", 0.35, 0.4),
    ("favorite", 0.6, 0.75),
    ("flexible", 0.4, 0.5),
    ("fresh", 0.45, 0.5),
    ("friendly", 0.55, 0.65),
    ("fun", 0.55, 0.7),
    ("good", 0.6, 0.6),
    ("great", 0.8, 0.75),
    ("happy", 0.65, 0.8),
    ("helpful", 0.6, 0.6),
    ("impressive", 0.65, 0.75),
    ("interesting", 0.45, 0.55),
    ("knowledgeable", 0.55, 0.6),
    ("like", 0.35, 0.5),
    ("liked", 0.35, 0.5),
    ("love", 0.7, 0.8),
    ("loved", 0.7, 0.8),
    ("modern", 0.35, 0.4),
    ("nice", 0.5, 0.6),
    ("organized", 0.45, 0.5),
    ("patient", 0.45, 0.55),
    ("perfect", 0.9, 0.9),
    ("pleasant", 0.55, 0.65),
    ("professional", 0.45, 0.5),
    ("prompt", 0.4, 0.45),
    ("quiet", 0.3, 0.45),
    ("recommend", 0.5, 0.55),
    ("reliable", 0.5, 0.5),
    ("responsive", 0.5, 0.5),
    ("safe", 0.4, 0.45),
    ("satisfied", 0.55, 0.65),
    ("smooth", 0.45, 0.5),
    ("spacious", 0.4, 0.5),
    ("supportive", 0.55, 0.6),
    ("thorough", 0.45, 0.5),
    ("useful", 0.5, 0.5),
    ("wonderful", 0.8, 0.9),
    // negative
    ("angry", -0.6, 0.8),
    ("annoyed", -0.5, 0.7),
    ("annoying", -0.55, 0.7),
    ("awful", -0.8, 0.9),
    ("bad", -0.6, 0.65),
    ("boring", -0.5, 0.7),
    ("broken", -0.55, 0.45),
    ("buggy", -0.5, 0.5),
    ("confusing", -0.5, 0.6),
    ("crowded", -0.4, 0.5),
    ("delayed", -0.4, 0.4),
    ("difficult", -0.4, 0.55),
    ("dirty", -0.55, 0.6),
    ("disappointed", -0.6, 0.75),
    ("disappointing", -0.6, 0.75),
    ("dislike", -0.45, 0.55),
    ("expensive", -0.4, 0.55),
    ("frustrated", -0.55, 0.75),
    ("frustrating", -0.6, 0.75),
    ("hard", -0.3, 0.5),
    ("hate", -0.75, 0.85),
    ("hated", -0.75, 0.85),
    ("horrible", -0.8, 0.9),
    ("inconvenient", -0.45, 0.55),
    ("inefficient", -0.45, 0.5),
    ("late", -0.35, 0.4),
    ("mediocre", -0.35, 0.6),
    ("messy", -0.45, 0.55),
    ("noisy", -0.4, 0.5),
    ("outdated", -0.4, 0.45),
    ("poor", -0.55, 0.6),
    ("rude", -0.65, 0.75),
    ("sad", -0.5, 0.75),
    ("slow", -0.4, 0.45),
    ("stale", -0.45, 0.55),
    ("terrible", -0.8, 0.9),
    ("uncomfortable", -0.5, 0.6),
    ("unfair", -0.5, 0.65),
    ("unhelpful", -0.55, 0.6),
    ("unreliable", -0.5, 0.55),
    ("unsafe", -0.55, 0.55),
    ("upset", -0.55, 0.75),
    ("useless", -0.6, 0.65),
    ("worst", -0.9, 0.75),
    ("worthless", -0.7, 0.7),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "neither", "nor", "cannot", "without",
];

/// Modifier words scaling the next sentiment-bearing token.
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("absolutely", 1.4),
    ("so", 1.2),
    ("too", 1.2),
    ("quite", 1.1),
    ("somewhat", 0.7),
    ("slightly", 0.6),
    ("barely", 0.5),
];

/// How many tokens a negation keeps affecting before it expires.
const NEGATION_WINDOW: usize = 3;

/// Negation flips and dampens the hit rather than mirroring it exactly
/// ("not great" is mildly negative, not the inverse of "great").
const NEGATION_FACTOR: f64 = -0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentCategory {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentResult {
    pub polarity: f64,
    pub subjectivity: f64,
    pub overall_sentiment: SentimentCategory,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentCounts {
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SentimentPercentages {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateStats {
    pub total_feedback: usize,
    pub average_polarity: f64,
    pub average_subjectivity: f64,
    pub sentiment_counts: SentimentCounts,
    pub percentages: SentimentPercentages,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndividualSentiment {
    pub id: i64,
    pub sentiment: SentimentResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSentiment {
    pub aggregate_stats: AggregateStats,
    pub individual_sentiments: Vec<IndividualSentiment>,
}

/// Lexicon polarity/subjectivity scoring. Results are derived values,
/// recomputed on every read and never persisted.
pub struct SentimentEngine;

impl SentimentEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, text: &str) -> SentimentResult {
        let mut polarities: Vec<f64> = Vec::new();
        let mut subjectivities: Vec<f64> = Vec::new();

        let mut intensity = 1.0_f64;
        let mut negation_remaining = 0usize;

        for token in tokenize(text) {
            if is_negator(&token) {
                negation_remaining = NEGATION_WINDOW;
                continue;
            }

            if let Some(factor) = intensifier_factor(&token) {
                intensity *= factor;
                continue;
            }

            if let Some((_, polarity, subjectivity)) = lexicon_entry(&token) {
                let mut polarity = polarity * intensity;
                if negation_remaining > 0 {
                    polarity *= NEGATION_FACTOR;
                }
                polarities.push(polarity.clamp(-1.0, 1.0));
                subjectivities.push((subjectivity * intensity).clamp(0.0, 1.0));

                intensity = 1.0;
                negation_remaining = 0;
            } else {
                negation_remaining = negation_remaining.saturating_sub(1);
                intensity = 1.0;
            }
        }

        let polarity = mean(&polarities);
        let subjectivity = mean(&subjectivities);

        SentimentResult {
            polarity,
            subjectivity,
            overall_sentiment: categorize(polarity),
        }
    }

    /// Batch scoring plus aggregate statistics. An empty batch yields a
    /// zeroed aggregate rather than dividing by zero.
    pub fn analyze_batch(&self, records: &[FeedbackRecord]) -> FeedbackSentiment {
        if records.is_empty() {
            return FeedbackSentiment {
                aggregate_stats: AggregateStats {
                    total_feedback: 0,
                    average_polarity: 0.0,
                    average_subjectivity: 0.0,
                    sentiment_counts: SentimentCounts::default(),
                    percentages: SentimentPercentages::default(),
                },
                individual_sentiments: Vec::new(),
            };
        }

        let mut individual_sentiments = Vec::with_capacity(records.len());
        let mut polarities = Vec::with_capacity(records.len());
        let mut subjectivities = Vec::with_capacity(records.len());
        let mut counts = SentimentCounts::default();

        for record in records {
            let sentiment = self.analyze(&record.message);
            polarities.push(sentiment.polarity);
            subjectivities.push(sentiment.subjectivity);
            match sentiment.overall_sentiment {
                SentimentCategory::Positive => counts.positive += 1,
                SentimentCategory::Negative => counts.negative += 1,
                SentimentCategory::Neutral => counts.neutral += 1,
            }
            individual_sentiments.push(IndividualSentiment {
                id: record.id,
                sentiment,
            });
        }

        let total = records.len();
        let percentages = SentimentPercentages {
            positive: 100.0 * counts.positive as f64 / total as f64,
            negative: 100.0 * counts.negative as f64 / total as f64,
            neutral: 100.0 * counts.neutral as f64 / total as f64,
        };

        FeedbackSentiment {
            aggregate_stats: AggregateStats {
                total_feedback: total,
                average_polarity: mean(&polarities),
                average_subjectivity: mean(&subjectivities),
                sentiment_counts: counts,
                percentages,
            },
            individual_sentiments,
        }
    }
}

impl Default for SentimentEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased alphabetic tokens; apostrophes survive so contractions like
/// "wasn't" reach the negation check intact.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|token| !token.is_empty())
        .map(|token| token.trim_matches('\'').to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_negator(token: &str) -> bool {
    NEGATORS.contains(&token) || token.ends_with("n't")
}

fn intensifier_factor(token: &str) -> Option<f64> {
    INTENSIFIERS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, factor)| *factor)
}

fn lexicon_entry(token: &str) -> Option<&'static (&'static str, f64, f64)> {
    LEXICON.iter().find(|(word, _, _)| *word == token)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Exact zero is its own bucket, not a tolerance band.
fn categorize(polarity: f64) -> SentimentCategory {
    if polarity > 0.0 {
        SentimentCategory::Positive
    } else if polarity < 0.0 {
        SentimentCategory::Negative
    } else {
        SentimentCategory::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, message: &str) -> FeedbackRecord {
        FeedbackRecord {
            id,
            message: message.to_string(),
            user_id: 1,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn positive_and_negative_words_score_accordingly() {
        let engine = SentimentEngine::new();

        let positive = engine.analyze("The library staff were helpful and friendly");
        assert!(positive.polarity > 0.0);
        assert_eq!(positive.overall_sentiment, SentimentCategory::Positive);

        let negative = engine.analyze("The wifi is terrible and the portal is slow");
        assert!(negative.polarity < 0.0);
        assert_eq!(negative.overall_sentiment, SentimentCategory::Negative);
    }

    #[test]
    fn text_without_lexicon_hits_is_exactly_neutral() {
        let engine = SentimentEngine::new();
        let result = engine.analyze("The cafeteria opens at nine on weekdays");
        assert_eq!(result.polarity, 0.0);
        assert_eq!(result.subjectivity, 0.0);
        assert_eq!(result.overall_sentiment, SentimentCategory::Neutral);
    }

    #[test]
    fn negation_flips_polarity() {
        let engine = SentimentEngine::new();

        let plain = engine.analyze("the lectures were great");
        let negated = engine.analyze("the lectures were not great");
        assert!(plain.polarity > 0.0);
        assert!(negated.polarity < 0.0);

        let contraction = engine.analyze("the staff wasn't helpful");
        assert!(contraction.polarity < 0.0);
    }

    #[test]
    fn intensifiers_scale_the_score() {
        let engine = SentimentEngine::new();
        let plain = engine.analyze("good course");
        let boosted = engine.analyze("very good course");
        assert!(boosted.polarity > plain.polarity);

        let dampened = engine.analyze("slightly good course");
        assert!(dampened.polarity < plain.polarity);
    }

    #[test]
    fn polarity_stays_clamped() {
        let engine = SentimentEngine::new();
        let result = engine.analyze("extremely absolutely perfect");
        assert!(result.polarity <= 1.0);
        assert!(result.subjectivity <= 1.0);
    }

    #[test]
    fn empty_batch_yields_zeroed_aggregate() {
        let engine = SentimentEngine::new();
        let batch = engine.analyze_batch(&[]);

        let stats = &batch.aggregate_stats;
        assert_eq!(stats.total_feedback, 0);
        assert_eq!(stats.average_polarity, 0.0);
        assert_eq!(stats.average_subjectivity, 0.0);
        assert_eq!(stats.sentiment_counts.total(), 0);
        assert_eq!(stats.percentages.positive, 0.0);
        assert_eq!(stats.percentages.negative, 0.0);
        assert_eq!(stats.percentages.neutral, 0.0);
        assert!(batch.individual_sentiments.is_empty());
    }

    #[test]
    fn batch_counts_sum_to_total_and_percentages_to_hundred() {
        let engine = SentimentEngine::new();
        let records = vec![
            record(1, "The new lab is excellent"),
            record(2, "Registration was a horrible experience"),
            record(3, "The bus runs every twenty minutes"),
            record(4, "Great food and friendly staff"),
            record(5, "The elevator is broken again"),
        ];

        let batch = engine.analyze_batch(&records);
        let stats = &batch.aggregate_stats;

        assert_eq!(stats.total_feedback, 5);
        assert_eq!(stats.sentiment_counts.total(), 5);
        assert_eq!(batch.individual_sentiments.len(), 5);

        let percentage_sum =
            stats.percentages.positive + stats.percentages.negative + stats.percentages.neutral;
        assert!((percentage_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn individual_sentiments_carry_record_ids() {
        let engine = SentimentEngine::new();
        let records = vec![record(7, "awesome gym"), record(9, "awful parking")];

        let batch = engine.analyze_batch(&records);
        let ids: Vec<i64> = batch
            .individual_sentiments
            .iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(ids, vec![7, 9]);
    }
}
