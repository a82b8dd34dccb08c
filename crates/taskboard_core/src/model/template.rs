//! Visual template record and palette helpers.
//!
//! # Invariants
//! - A palette always has exactly nine named slots.
//! - Only the Dark seed carries `is_default = true` and is never deleted;
//!   the Light seed is an ordinary, deletable template.
//! - At most one template is active per collection; the template store
//!   keeps it at exactly one.

use crate::model::validation::{require_id, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("valid hex regex")
});

/// Opaque template identifier.
pub type TemplateId = String;

/// Id of the built-in template active on first run.
pub const DARK_TEMPLATE_ID: &str = "default-dark";
/// Id of the second built-in template.
pub const LIGHT_TEMPLATE_ID: &str = "default-light";

/// Nine-slot color palette applied by the presentation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub primary: String,
    pub variant: String,
    #[serde(rename = "text-100")]
    pub text_100: String,
    #[serde(rename = "text-200")]
    pub text_200: String,
    #[serde(rename = "text-300")]
    pub text_300: String,
    #[serde(rename = "text-400")]
    pub text_400: String,
    #[serde(rename = "bg-100")]
    pub bg_100: String,
    #[serde(rename = "bg-200")]
    pub bg_200: String,
    #[serde(rename = "bg-300")]
    pub bg_300: String,
}

impl ColorScheme {
    /// Derives a full palette from three base colors.
    ///
    /// Text shades are the text color with alpha 0.7/0.5/0.125; background
    /// shades are the background lightened by 5% and 10%.
    pub fn from_base_colors(
        primary: &str,
        text: &str,
        background: &str,
    ) -> Result<Self, ValidationError> {
        for color in [primary, text, background] {
            if !is_hex_color(color) {
                return Err(ValidationError::InvalidColor(color.to_string()));
            }
        }
        let text = to_rgb_hex(text);
        let background = to_rgb_hex(background);

        Ok(Self {
            primary: primary.to_string(),
            variant: primary.to_string(),
            text_100: text.clone(),
            text_200: with_alpha(&text, 0.7),
            text_300: with_alpha(&text, 0.5),
            text_400: with_alpha(&text, 0.125),
            bg_100: background.clone(),
            bg_200: lighten(&background, 5.0),
            bg_300: lighten(&background, 10.0),
        })
    }

    /// `(slot name, value)` pairs in presentation order.
    pub fn slots(&self) -> [(&'static str, &str); 9] {
        [
            ("primary", self.primary.as_str()),
            ("variant", self.variant.as_str()),
            ("text-100", self.text_100.as_str()),
            ("text-200", self.text_200.as_str()),
            ("text-300", self.text_300.as_str()),
            ("text-400", self.text_400.as_str()),
            ("bg-100", self.bg_100.as_str()),
            ("bg-200", self.bg_200.as_str()),
            ("bg-300", self.bg_300.as_str()),
        ]
    }
}

/// Named palette. Serialized `default` marks protected templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub active: bool,
    pub name: String,
    pub colors: ColorScheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "default")]
    pub is_default: bool,
}

impl Template {
    pub fn new(id: impl Into<TemplateId>, name: impl Into<String>, colors: ColorScheme) -> Self {
        Self {
            id: id.into(),
            active: false,
            name: name.into(),
            colors,
            description: None,
            is_default: false,
        }
    }

    /// Builds a user template from three base colors with a generated id.
    pub fn custom(
        name: impl Into<String>,
        primary: &str,
        text: &str,
        background: &str,
    ) -> Result<Self, ValidationError> {
        let colors = ColorScheme::from_base_colors(primary, text, background)?;
        Ok(Self::new(Uuid::new_v4().to_string(), name, colors))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Built-in templates seeded into an empty collection.
pub fn builtin_templates() -> Vec<Template> {
    vec![
        Template {
            id: DARK_TEMPLATE_ID.to_string(),
            active: true,
            name: "Dark".to_string(),
            colors: palette([
                "#a056c5ff",
                "#2643c4",
                "#e2fdff",
                "#cbd5e1",
                "#9d9ab420",
                "#e2fdff12",
                "#08153c",
                "#081e60",
                "#051956",
            ]),
            description: Some(
                "Dark theme for a modern look with electric purple and royal blue accents."
                    .to_string(),
            ),
            is_default: true,
        },
        Template {
            id: LIGHT_TEMPLATE_ID.to_string(),
            active: false,
            name: "Light".to_string(),
            colors: palette([
                "#a056c5",
                "#2643c4",
                "#373b5e",
                "#9d9ab4",
                "#c4c4c4",
                "#373b5e0f",
                "#adbaeb",
                "#ffffff",
                "#f4f6fd",
            ]),
            description: Some(
                "Light theme with a soft lavender-blue background and dark-blue text.".to_string(),
            ),
            is_default: false,
        },
    ]
}

fn palette(values: [&str; 9]) -> ColorScheme {
    let [primary, variant, text_100, text_200, text_300, text_400, bg_100, bg_200, bg_300] =
        values.map(str::to_string);
    ColorScheme {
        primary,
        variant,
        text_100,
        text_200,
        text_300,
        text_400,
        bg_100,
        bg_200,
        bg_300,
    }
}

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// Normalizes a validated hex color to lowercase `#rrggbb`.
fn to_rgb_hex(color: &str) -> String {
    let digits = color.trim_start_matches('#').to_ascii_lowercase();
    if digits.len() == 3 {
        let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
        return format!("#{expanded}");
    }
    format!("#{}", &digits[..6])
}

fn with_alpha(rgb_hex: &str, opacity: f64) -> String {
    let alpha = (opacity * 255.0).round() as u8;
    format!("{rgb_hex}{alpha:02x}")
}

fn lighten(rgb_hex: &str, percent: f64) -> String {
    let value = u32::from_str_radix(&rgb_hex[1..], 16).unwrap_or(0);
    let amount = (2.55 * percent).round() as i64;
    let channel =
        |shift: u32| -> i64 { (i64::from((value >> shift) & 0xff) + amount).clamp(0, 255) };
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(16),
        channel(8),
        channel(0)
    )
}

#[cfg(test)]
mod tests {
    use super::{builtin_templates, is_hex_color, ColorScheme, Template, DARK_TEMPLATE_ID};
    use crate::model::validation::ValidationError;

    #[test]
    fn derives_palette_from_base_colors() {
        let scheme = ColorScheme::from_base_colors("#f13d3d", "#e9c5c5", "#000000")
            .expect("valid base colors");
        assert_eq!(scheme.variant, "#f13d3d");
        assert_eq!(scheme.text_200, "#e9c5c5b3");
        assert_eq!(scheme.text_300, "#e9c5c580");
        assert_eq!(scheme.text_400, "#e9c5c520");
        assert_eq!(scheme.bg_200, "#0d0d0d");
        assert_eq!(scheme.bg_300, "#1a1a1a");
    }

    #[test]
    fn lightening_saturates_at_white() {
        let scheme = ColorScheme::from_base_colors("#fff", "#000", "#fafafa")
            .expect("valid base colors");
        assert_eq!(scheme.bg_300, "#ffffff");
        assert_eq!(scheme.text_100, "#000000");
    }

    #[test]
    fn rejects_non_hex_colors() {
        let err = ColorScheme::from_base_colors("red", "#000", "#000")
            .expect_err("named colors are rejected");
        assert_eq!(err, ValidationError::InvalidColor("red".to_string()));
        assert!(!is_hex_color("#12345"));
        assert!(is_hex_color("#a056c5ff"));
    }

    #[test]
    fn builtins_have_exactly_one_active() {
        let templates = builtin_templates();
        assert_eq!(templates.iter().filter(|t| t.active).count(), 1);
        let protected: Vec<&str> = templates
            .iter()
            .filter(|t| t.is_default)
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(protected, [DARK_TEMPLATE_ID]);
    }

    #[test]
    fn custom_template_is_inactive_and_not_builtin() {
        let template = Template::custom("Mine", "#f13d3d", "#e9c5c5", "#000000")
            .expect("valid custom template");
        assert!(!template.active);
        assert!(!template.is_default);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn serializes_palette_slots_with_dashed_names() {
        let template = builtin_templates().remove(0);
        let value = serde_json::to_value(&template).expect("template should serialize");
        assert_eq!(value["colors"]["bg-100"], "#08153c");
        assert_eq!(value["default"], true);
    }
}
