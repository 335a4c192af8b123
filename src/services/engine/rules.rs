//! Ordered `(predicate, weight, label)` rule evaluation.
//!
//! The scoring components accumulate a signed score and the labels of every
//! rule that fired. Rules run in declaration order, which matters wherever a
//! later rule overrides an earlier classification.

/// A single scoring rule over a context `C`.
pub struct Rule<C> {
    pub label: &'static str,
    pub weight: f64,
    pub predicate: fn(&C) -> bool,
}

impl<C> Rule<C> {
    pub const fn new(label: &'static str, weight: f64, predicate: fn(&C) -> bool) -> Self {
        Self {
            label,
            weight,
            predicate,
        }
    }
}

/// Running `(score, labels)` accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scorecard {
    pub score: f64,
    pub labels: Vec<String>,
}

impl Scorecard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `weight` and record `label`.
    pub fn add(&mut self, weight: f64, label: impl Into<String>) {
        self.score += weight;
        self.labels.push(label.into());
    }

    /// Add `weight` without recording a label.
    pub fn bump(&mut self, weight: f64) {
        self.score += weight;
    }

    /// Evaluate `rules` in order against `ctx`. Returns the number that fired.
    pub fn apply<C>(&mut self, rules: &[Rule<C>], ctx: &C) -> usize {
        let mut fired = 0;
        for rule in rules {
            if (rule.predicate)(ctx) {
                self.add(rule.weight, rule.label);
                fired += 1;
            }
        }
        fired
    }

    pub fn first_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

/// Last matching rule wins. Used for phase classification where later
/// checks override earlier ones.
pub fn last_match<'a, C>(rules: &'a [Rule<C>], ctx: &C) -> Option<&'a Rule<C>> {
    rules.iter().filter(|rule| (rule.predicate)(ctx)).last()
}
