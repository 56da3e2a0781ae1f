//! Property key tables: the render style filter and text dirtiness

use rustc_hash::FxHashSet;

use crate::value::PropMap;

/// Style keys the UI side actually renders
///
/// Anything else in a node's style map is layout-only (flex, margins...)
/// and stays on the document side.
pub const RENDER_STYLE_KEYS: &[&str] = &[
    "backgroundColor",
    "backgroundImage",
    "backgroundPositionX",
    "backgroundPositionY",
    "backgroundSize",
    "borderColor",
    "borderRadius",
    "borderStyle",
    "borderWidth",
    "borderTopColor",
    "borderTopStyle",
    "borderTopWidth",
    "borderTopLeftRadius",
    "borderTopRightRadius",
    "borderRightColor",
    "borderRightStyle",
    "borderRightWidth",
    "borderBottomColor",
    "borderBottomStyle",
    "borderBottomWidth",
    "borderBottomLeftRadius",
    "borderBottomRightRadius",
    "borderLeftColor",
    "borderLeftStyle",
    "borderLeftWidth",
    "linearGradient",
    "shadowColor",
    "shadowOffset",
    "shadowOffsetX",
    "shadowOffsetY",
    "shadowOpacity",
    "shadowRadius",
    "zIndex",
    "capInsets",
    "defaultSource",
    "resizeMode",
    "tintColor",
    "tintColorBlendMode",
    "src",
    "fakeBold",
    "breakStrategy",
    "color",
    "ellipsizeMode",
    "enableScale",
    "fontFamily",
    "fontSize",
    "fontStyle",
    "fontWeight",
    "letterSpacing",
    "lineHeight",
    "lineSpacingExtra",
    "lineSpacingMultiplier",
    "numberOfLines",
    "text",
    "textAlign",
    "textDecorationColor",
    "textDecorationLine",
    "textDecorationStyle",
    "textShadowColor",
    "textShadowOffset",
    "textShadowRadius",
    "verticalAlign",
    "width",
    "height",
    "left",
    "top",
    "visibility",
    "transform",
    "opacity",
    "overflow",
    "direction",
];

/// Keys whose change invalidates a text node's measured size
pub const TEXT_LAYOUT_KEYS: &[&str] = &[
    "fontStyle",
    "letterSpacing",
    "color",
    "fontSize",
    "fontFamily",
    "fontWeight",
    "textDecorationLine",
    "textShadowOffset",
    "textShadowRadius",
    "textShadowColor",
    "lineHeight",
    "textAlign",
    "text",
    "enableScale",
    "numberOfLines",
];

/// True if a diff touches any key that affects text layout
pub fn is_text_dirty(diff_props: &PropMap) -> bool {
    diff_props
        .keys()
        .any(|key| TEXT_LAYOUT_KEYS.contains(&key.as_str()))
}

/// Filters style maps down to render-relevant keys
#[derive(Debug, Clone)]
pub struct StyleFilter {
    keys: FxHashSet<&'static str>,
    enabled: bool,
}

impl Default for StyleFilter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StyleFilter {
    /// A disabled filter passes every key through
    pub fn new(enabled: bool) -> Self {
        Self {
            keys: RENDER_STYLE_KEYS.iter().copied().collect(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn allows(&self, key: &str) -> bool {
        !self.enabled || self.keys.contains(key)
    }

    /// Filtered style entries followed by every custom (ext) entry
    ///
    /// Custom entries win on key collisions.
    pub fn merge(&self, style: &PropMap, ext: &PropMap) -> PropMap {
        let mut props: PropMap = style
            .iter()
            .filter(|(key, _)| self.allows(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, value) in ext {
            props.insert(key.clone(), value.clone());
        }
        props
    }
}
