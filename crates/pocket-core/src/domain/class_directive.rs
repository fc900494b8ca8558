//! Class-name directives applied at the end of a cycle.
//!
//! ```text
//! h-<cache>-<member>     append the value once, then drop the class
//! h--<cache>-<member>    replace the content on every cycle
//! f-<format>             format the content once, then drop the class
//! f--<format>            format the content on every cycle
//! ```

/// Prefix of hydration classes.
pub const HYDRATE_PREFIX: &str = "h-";
/// Prefix of formatting classes.
pub const FORMAT_PREFIX: &str = "f-";
/// Hydration cache name that reads the key from `data-h-data-ref`.
pub const DATA_REF_CACHE: &str = "dataRef";
/// Hydration cache name that reads the enclosing clone's record.
pub const RECORD_CACHE: &str = "coreRecord";
/// Attribute naming the data key for the `dataRef` cache.
pub const DATA_REF_ATTR: &str = "data-h-data-ref";
/// Attribute holding the fallback text for formatting.
pub const FORMAT_DEFAULT_ATTR: &str = "data-f-default";
/// Attribute holding the clue for formatting.
pub const FORMAT_CLUE_ATTR: &str = "data-f-clue";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrateClass {
    pub cache: String,
    /// Path into the cached value; empty for the whole value.
    pub member: String,
    pub every_cycle: bool,
}

impl HydrateClass {
    pub fn parse(class: &str) -> Option<Self> {
        if !class.starts_with(HYDRATE_PREFIX) {
            return None;
        }
        let every_cycle = class.contains("h--");
        let normalized = class.replace("--", "-");
        let mut parts = normalized.split('-').skip(1);
        let cache = parts.next().filter(|c| !c.is_empty())?;
        let member = parts.next().unwrap_or_default();
        Some(Self {
            cache: cache.to_string(),
            member: member.to_string(),
            every_cycle,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatClass {
    /// Lower-cased format name with dashes removed.
    pub format: String,
    pub every_cycle: bool,
}

impl FormatClass {
    pub fn parse(class: &str) -> Option<Self> {
        if !class.starts_with(FORMAT_PREFIX) {
            return None;
        }
        let format = class
            .replace(FORMAT_PREFIX, "")
            .replace('-', "")
            .to_lowercase();
        (!format.is_empty()).then(|| Self {
            format,
            every_cycle: class.contains("f--"),
        })
    }
}
