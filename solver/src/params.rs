//! Global tuning parameters that can be overridden through environment variables.
//!
//! A parameter is read from its environment variable on first access and keeps that value for the rest of
//! the process. Unset or unparsable variables fall back to the declared default.
//!
//! ```
//! use probgen::params::EnvParam;
//! static ROUNDS: EnvParam<u32> = EnvParam::new("PROBGEN_DOC_ROUNDS", "3");
//!
//! assert_eq!(ROUNDS.get(), 3);
//! ```

use std::str::FromStr;

use once_cell::sync::OnceCell;

/// Whether the independence checkers may remove edges that would inevitably create a shared dependency.
/// When disabled they only detect violations.
pub static INDEPENDENCE_PRUNING: EnvParam<bool> = EnvParam::new("PROBGEN_INDEPENDENCE_PRUNING", "true");

pub struct EnvParam<T> {
    value: OnceCell<T>,
    env: &'static str,
    default: &'static str,
}

impl<T> EnvParam<T> {
    pub const fn new(env: &'static str, default: &'static str) -> EnvParam<T> {
        EnvParam {
            value: OnceCell::new(),
            env,
            default,
        }
    }

    pub fn name(&self) -> &'static str {
        self.env
    }
}

impl<T: FromStr> EnvParam<T> {
    fn read_default(&self) -> T {
        match T::from_str(self.default) {
            Ok(v) => v,
            Err(_) => panic!("{}: invalid default value \"{}\"", self.env, self.default),
        }
    }

    fn read(&self) -> T {
        match std::env::var(self.env) {
            Ok(raw) => match T::from_str(&raw) {
                Ok(value) => value,
                Err(_) => {
                    tracing::warn!(
                        param = self.env,
                        value = raw.as_str(),
                        default = self.default,
                        "unparsable parameter, using default"
                    );
                    self.read_default()
                }
            },
            Err(_) => self.read_default(),
        }
    }

    /// Returns the value of the parameter, reading the environment on first access.
    ///
    /// # Panics
    ///
    /// If the default value cannot be parsed.
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        *self.get_ref()
    }

    pub fn get_ref(&self) -> &T {
        self.value.get_or_init(|| self.read())
    }

    /// Forces the value of the parameter. Returns false if it was already initialized (by a read or a previous
    /// call), in which case the value is left unchanged.
    pub fn set(&self, value: T) -> bool {
        self.value.set(value).is_ok()
    }
}
