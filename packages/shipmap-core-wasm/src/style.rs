//! Cluster symbology.
//!
//! Symbols are picked from an ordered table of member-count ranges. The first
//! range is always the single-ship symbol for exactly one member; every later
//! range is an aggregate symbol carrying the member count as its label.

use serde::{Deserialize, Serialize};

use crate::error::MapError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleSymbol {
    pub radius: f64,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

impl Default for CircleSymbol {
    // Filled red dot used for an individual ship
    fn default() -> Self {
        CircleSymbol {
            radius: 10.0,
            fill: "#ff0000".to_string(),
            stroke: "#ff0000".to_string(),
            stroke_width: 1.0,
        }
    }
}

/// How a multi-ship cluster is drawn. There is no default on purpose, the
/// host picks one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AggregateAppearance {
    /// Image symbol; `size` is its drawn width and height in pixels.
    #[serde(rename_all = "camelCase")]
    Icon { src: String, size: f64 },
    #[serde(rename_all = "camelCase")]
    Circle {
        radius: f64,
        fill: String,
        stroke: String,
        stroke_width: f64,
    },
}

impl AggregateAppearance {
    fn to_symbol(&self) -> Symbol {
        match self {
            AggregateAppearance::Icon { src, size } => Symbol::Icon {
                src: src.clone(),
                size: *size,
            },
            AggregateAppearance::Circle {
                radius,
                fill,
                stroke,
                stroke_width,
            } => Symbol::Circle(CircleSymbol {
                radius: *radius,
                fill: fill.clone(),
                stroke: stroke.clone(),
                stroke_width: *stroke_width,
            }),
        }
    }
}

/// What the renderer draws at a cluster's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Symbol {
    Circle(CircleSymbol),
    Icon { src: String, size: f64 },
}

impl Symbol {
    /// Radius of the drawn footprint in pixels, used for hit detection.
    pub fn hit_radius(&self) -> f64 {
        match self {
            Symbol::Circle(circle) => circle.radius + circle.stroke_width / 2.0,
            Symbol::Icon { size, .. } => size / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleKind {
    Single,
    Aggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    pub kind: StyleKind,
    pub symbol: Symbol,
    pub label: Option<Label>,
}

/// Member counts `min..=max` (open-ended when `max` is `None`) map to `symbol`.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub min: usize,
    pub max: Option<usize>,
    pub kind: StyleKind,
    pub symbol: Symbol,
}

impl StyleRule {
    fn matches(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

/// Extra aggregate range starting at `min` members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleBucket {
    pub min: usize,
    pub appearance: AggregateAppearance,
}

fn default_label_color() -> String {
    "#fff".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    #[serde(default)]
    pub single: CircleSymbol,
    pub aggregate: AggregateAppearance,
    #[serde(default = "default_label_color")]
    pub label_color: String,
    #[serde(default)]
    pub buckets: Vec<StyleBucket>,
}

impl StyleConfig {
    pub fn new(aggregate: AggregateAppearance) -> Self {
        StyleConfig {
            single: CircleSymbol::default(),
            aggregate,
            label_color: default_label_color(),
            buckets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleSelector {
    rules: Vec<StyleRule>,
    label_color: String,
}

impl StyleSelector {
    /// Build a selector from an explicit rule table.
    ///
    /// The table must start with a single-member rule for exactly 1, continue
    /// with aggregate rules that follow each other without gaps or overlap,
    /// and end with an open-ended rule.
    pub fn new(rules: Vec<StyleRule>, label_color: impl Into<String>) -> Result<Self, MapError> {
        validate_rules(&rules)?;
        Ok(StyleSelector {
            rules,
            label_color: label_color.into(),
        })
    }

    pub fn from_config(config: &StyleConfig) -> Result<Self, MapError> {
        let mut rules = vec![StyleRule {
            min: 1,
            max: Some(1),
            kind: StyleKind::Single,
            symbol: Symbol::Circle(config.single.clone()),
        }];

        let mut start = 2;
        let mut appearance = &config.aggregate;
        for bucket in &config.buckets {
            if bucket.min <= start {
                return Err(MapError::InvalidStyleRules(format!(
                    "bucket starting at {} must start above {}",
                    bucket.min, start
                )));
            }
            rules.push(StyleRule {
                min: start,
                max: Some(bucket.min - 1),
                kind: StyleKind::Aggregate,
                symbol: appearance.to_symbol(),
            });
            start = bucket.min;
            appearance = &bucket.appearance;
        }
        rules.push(StyleRule {
            min: start,
            max: None,
            kind: StyleKind::Aggregate,
            symbol: appearance.to_symbol(),
        });

        StyleSelector::new(rules, config.label_color.clone())
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    /// Descriptor for a cluster of `count` members. Counts below one are
    /// treated as one.
    pub fn select(&self, count: usize) -> StyleDescriptor {
        let count = count.max(1);
        // Validated tables cover 1.. without gaps; the last rule is the fallback
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.matches(count))
            .or_else(|| self.rules.last());

        match rule {
            Some(rule) => StyleDescriptor {
                kind: rule.kind,
                symbol: rule.symbol.clone(),
                label: match rule.kind {
                    StyleKind::Single => None,
                    StyleKind::Aggregate => Some(Label {
                        text: count.to_string(),
                        color: self.label_color.clone(),
                    }),
                },
            },
            None => StyleDescriptor {
                kind: StyleKind::Single,
                symbol: Symbol::Circle(CircleSymbol::default()),
                label: None,
            },
        }
    }
}

fn validate_rules(rules: &[StyleRule]) -> Result<(), MapError> {
    let first = rules
        .first()
        .ok_or_else(|| MapError::InvalidStyleRules("rule table is empty".to_string()))?;
    if first.min != 1 || first.max != Some(1) || first.kind != StyleKind::Single {
        return Err(MapError::InvalidStyleRules(
            "first rule must be the single symbol for exactly 1 member".to_string(),
        ));
    }

    for (i, pair) in rules.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        let prev_max = prev.max.ok_or_else(|| {
            MapError::InvalidStyleRules(format!("rule {} is open-ended but not last", i))
        })?;
        let expected = prev_max.checked_add(1).ok_or_else(|| {
            MapError::InvalidStyleRules(format!("rule {} ends at usize::MAX but is not last", i))
        })?;
        if next.min != expected {
            return Err(MapError::InvalidStyleRules(format!(
                "rule {} starts at {}, expected {}",
                i + 1,
                next.min,
                expected
            )));
        }
        if next.max.map_or(false, |max| max < next.min) {
            return Err(MapError::InvalidStyleRules(format!(
                "rule {} has an empty range",
                i + 1
            )));
        }
        if next.kind != StyleKind::Aggregate {
            return Err(MapError::InvalidStyleRules(format!(
                "rule {} covers more than one member and must be an aggregate",
                i + 1
            )));
        }
    }

    match rules.last() {
        Some(last) if last.max.is_none() => Ok(()),
        _ => Err(MapError::InvalidStyleRules(
            "last rule must be open-ended".to_string(),
        )),
    }
}
