use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use groupset_error::{DbError, Result};

/// Configuration for planning grouping sets.
///
/// Defaults impose no limits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingConfig {
    /// Max number of combinations (including grand totals) a GROUP BY may
    /// expand to. Zero means unlimited.
    pub max_grouping_sets: u64,
    /// Error on GROUP BY elements that don't resolve to a column instead of
    /// planning them as unresolved.
    pub verify_group_by_references: bool,
}

impl GroupingConfig {
    pub fn set_from_value(&mut self, name: &str, value: SettingValue) -> Result<()> {
        let func = get_setting(name)?;
        (func.set)(value, self)
    }

    pub fn get_as_value(&self, name: &str) -> Result<SettingValue> {
        let func = get_setting(name)?;
        Ok((func.get)(self))
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::default();
        let func = get_setting(name)?;

        let value = (func.get)(&def_conf);
        (func.set)(value, self)
    }

    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// Iterate (name, description, current value) for all settings, ordered by
    /// name.
    pub fn settings(&self) -> Vec<(&'static str, &'static str, SettingValue)> {
        let mut settings: Vec<_> = GET_SET_FUNCTIONS
            .iter()
            .map(|(name, func)| (*name, func.description, (func.get)(self)))
            .collect();
        settings.sort_by_key(|(name, _, _)| *name);
        settings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    UInt64(u64),
}

impl SettingValue {
    pub fn try_as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(DbError::new("Setting value is not a bool").with_field("value", other)),
        }
    }

    pub fn try_as_u64(&self) -> Result<u64> {
        match self {
            Self::UInt64(v) => Ok(*v),
            other => Err(
                DbError::new("Setting value is not an unsigned integer").with_field("value", other),
            ),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<u64> for SettingValue {
    fn from(value: u64) -> Self {
        SettingValue::UInt64(value)
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
        }
    }
}

struct SettingFunctions {
    description: &'static str,
    set: fn(value: SettingValue, conf: &mut GroupingConfig) -> Result<()>,
    get: fn(conf: &GroupingConfig) -> SettingValue,
}

impl SettingFunctions {
    const fn new<S: GroupingSetting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_value as _,
            get: S::get_as_value as _,
        }
    }
}

fn get_setting(name: &str) -> Result<&'static SettingFunctions> {
    GET_SET_FUNCTIONS
        .get(name)
        .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))
}

fn insert_setting<S: GroupingSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<MaxGroupingSets>(&mut map);
    insert_setting::<VerifyGroupByReferences>(&mut map);

    map
});

pub trait GroupingSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_value(value: SettingValue, conf: &mut GroupingConfig) -> Result<()>;
    fn get_as_value(conf: &GroupingConfig) -> SettingValue;
}

pub struct MaxGroupingSets;

impl GroupingSetting for MaxGroupingSets {
    const NAME: &'static str = "max_grouping_sets";
    const DESCRIPTION: &'static str =
        "Max number of grouping sets a GROUP BY may expand to. Zero disables the limit.";

    fn set_from_value(value: SettingValue, conf: &mut GroupingConfig) -> Result<()> {
        conf.max_grouping_sets = value.try_as_u64()?;
        Ok(())
    }

    fn get_as_value(conf: &GroupingConfig) -> SettingValue {
        conf.max_grouping_sets.into()
    }
}

pub struct VerifyGroupByReferences;

impl GroupingSetting for VerifyGroupByReferences {
    const NAME: &'static str = "verify_group_by_references";
    const DESCRIPTION: &'static str =
        "Error if a GROUP BY expression doesn't reference a column in the select list.";

    fn set_from_value(value: SettingValue, conf: &mut GroupingConfig) -> Result<()> {
        conf.verify_group_by_references = value.try_as_bool()?;
        Ok(())
    }

    fn get_as_value(conf: &GroupingConfig) -> SettingValue {
        conf.verify_group_by_references.into()
    }
}
