//! Encode and decode configuration.

/// Options for [crate::did::Did::decode].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Substitute choice labels for raw values that have one.
    pub decode_choices: bool,
    /// Apply `raw * scale + offset`.
    pub scaling: bool,
    /// Tolerate input shorter than the layout: leaves past the end are
    /// omitted and repeating fields stop at the last complete item.
    pub allow_truncated: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            decode_choices: true,
            scaling: true,
            allow_truncated: false,
        }
    }
}

impl DecodeOptions {
    /// Raw numbers only: no choices, no scaling.
    pub fn raw() -> Self {
        Self {
            decode_choices: false,
            scaling: false,
            ..Default::default()
        }
    }

    pub fn set_decode_choices(&mut self, decode_choices: bool) -> &mut Self {
        self.decode_choices = decode_choices;
        self
    }

    pub fn set_scaling(&mut self, scaling: bool) -> &mut Self {
        self.scaling = scaling;
        self
    }

    pub fn set_allow_truncated(&mut self, allow_truncated: bool) -> &mut Self {
        self.allow_truncated = allow_truncated;
        self
    }
}

/// Options for [crate::did::Did::encode].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Convert physical values to raw with `round((value - offset) / scale)`.
    pub scaling: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { scaling: true }
    }
}

impl EncodeOptions {
    /// Values are already raw.
    pub fn raw() -> Self {
        Self { scaling: false }
    }
}
