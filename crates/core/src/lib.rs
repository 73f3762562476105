pub mod claim;
pub mod color;
pub mod config;

pub use csscolorparser::Color;

pub use claim::{
    claim_role_name, plan_role_claim, ClaimInput, ClaimPlan, RoleSnapshot, RoleSpec,
};
pub use color::{
    color_from_u32, parse_color, random_color, ColorOps, ColorParseError, LIGHTNESS_STEP,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
