//! Conditional weighted random selection
//!
//! Log templates and adventures are picked by weight, after filtering out
//! entries whose conditions (`level>=5,luck>10`) the character does not meet.
//! Adventure types scale their weight with the matching attribute.

use rand::Rng;

use super::data::{Adventure, LogTemplate};
use super::state::CultivationState;

/// Anything that can take part in a weighted draw
pub trait Weighted {
    /// Weight before modifiers
    fn base_weight(&self) -> f64;

    /// Category used by weight modifiers (`rare`, `cultivation`, `combat`)
    fn kind(&self) -> &str {
        ""
    }

    /// Comma-separated condition list, empty when unrestricted
    fn conditions(&self) -> &str {
        ""
    }

    /// Entries below this realm are damped
    fn min_realm(&self) -> Option<f64> {
        None
    }
}

impl Weighted for LogTemplate {
    fn base_weight(&self) -> f64 {
        self.weight
    }
}

impl Weighted for Adventure {
    fn base_weight(&self) -> f64 {
        self.weight
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn conditions(&self) -> &str {
        &self.conditions
    }

    fn min_realm(&self) -> Option<f64> {
        self.min_realm
    }
}

/// Comparison operator; parse order matters (`>=` before `>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
}

impl Op {
    const PARSE_ORDER: [(&'static str, Op); 6] = [
        (">=", Op::Ge),
        ("<=", Op::Le),
        (">", Op::Gt),
        ("<", Op::Lt),
        ("==", Op::Eq),
        ("!=", Op::Ne),
    ];
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    pub value: Operand,
}

impl Condition {
    /// Parse `field op value`; `None` when no operator is found
    pub fn parse(part: &str) -> Option<Self> {
        let (index, token, op) = Op::PARSE_ORDER
            .iter()
            .find_map(|(token, op)| part.find(token).map(|i| (i, *token, *op)))?;
        let field = part[..index].trim().to_string();
        let raw = part[index + token.len()..].trim();
        let value = match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Operand::Number(n),
            _ => Operand::Text(raw.to_string()),
        };
        Some(Self { field, op, value })
    }

    pub fn evaluate(&self, state: &CultivationState) -> bool {
        let Some(actual) = state.field_value(&self.field) else {
            log::debug!("Unknown condition field '{}'", self.field);
            return false;
        };
        match &self.value {
            Operand::Number(expected) => {
                let expected = *expected;
                match self.op {
                    Op::Ge => actual >= expected,
                    Op::Le => actual <= expected,
                    Op::Gt => actual > expected,
                    Op::Lt => actual < expected,
                    Op::Eq => actual == expected,
                    Op::Ne => actual != expected,
                }
            }
            // A number never equals (or orders against) text
            Operand::Text(_) => self.op == Op::Ne,
        }
    }
}

/// Split a comma-separated condition list, skipping unparseable parts
pub fn parse_conditions(text: &str) -> Vec<Condition> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let condition = Condition::parse(part);
            if condition.is_none() {
                log::debug!("Skipping unparseable condition '{}'", part);
            }
            condition
        })
        .collect()
}

/// True when every condition of `item` holds
pub fn check_conditions<T: Weighted>(item: &T, state: &CultivationState) -> bool {
    parse_conditions(item.conditions())
        .iter()
        .all(|c| c.evaluate(state))
}

/// Multiplier applied to the base weight, never below 0.01
pub fn weight_modifier<T: Weighted>(item: &T, state: &CultivationState) -> f64 {
    let attrs = &state.attributes;
    let mut modifier = match item.kind() {
        "rare" => 1.0 + (attrs.luck as f64).min(100.0) * 0.01,
        "cultivation" => 1.0 + ((attrs.comprehension as f64) + 1.0).log10() * 0.05,
        "combat" => 1.0 + ((attrs.attack as f64) + 1.0).log10() * 0.03,
        _ => 1.0,
    };
    if let Some(min_realm) = item.min_realm() {
        let diff = state.realm_index as f64 - min_realm;
        if diff < 0.0 {
            modifier *= 1.0 / (1.0 + diff.abs());
        }
    }
    if modifier.is_finite() {
        modifier.max(0.01)
    } else {
        1.0
    }
}

pub fn item_weight<T: Weighted>(item: &T, state: &CultivationState) -> f64 {
    let weight = item.base_weight() * weight_modifier(item, state);
    if weight.is_finite() { weight.max(0.0) } else { 0.0 }
}

/// Roulette-wheel pick over modified weights
///
/// Falls back to a uniform pick when every weight is zero.
pub fn weighted_random_select<'a, T: Weighted>(
    items: &'a [T],
    state: &CultivationState,
    rng: &mut impl Rng,
) -> Option<&'a T> {
    let refs: Vec<&T> = items.iter().collect();
    weighted_index(&refs, state, rng).map(|i| &items[i])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectOptions {
    /// Probability that the draw happens at all
    pub trigger_rate: f64,
    /// Return `None` instead of a fallback item when nothing is drawn
    pub allow_empty: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            trigger_rate: 1.0,
            allow_empty: true,
        }
    }
}

/// Filter by conditions, roll the trigger rate, then pick by weight
pub fn select_by_weight_and_condition<'a, T: Weighted>(
    items: &'a [T],
    state: &CultivationState,
    options: SelectOptions,
    rng: &mut impl Rng,
) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }

    let valid: Vec<&T> = items
        .iter()
        .filter(|item| check_conditions(*item, state))
        .collect();
    if valid.is_empty() {
        return if options.allow_empty { None } else { items.first() };
    }

    if rng.random::<f64>() > options.trigger_rate {
        return if options.allow_empty { None } else { Some(valid[0]) };
    }

    let index = weighted_index(&valid, state, rng)?;
    Some(valid[index])
}

fn weighted_index<T: Weighted>(
    items: &[&T],
    state: &CultivationState,
    rng: &mut impl Rng,
) -> Option<usize> {
    let weights: Vec<f64> = items.iter().map(|i| item_weight(*i, state)).collect();
    match weights.len() {
        0 => return None,
        1 => return Some(0),
        _ => {}
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Some(rng.random_range(0..weights.len()));
    }
    let mut roll = rng.random::<f64>() * total;
    for (i, weight) in weights.iter().enumerate() {
        roll -= weight;
        if roll <= 0.0 {
            return Some(i);
        }
    }
    Some(weights.len() - 1)
}
