use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use mongodb::bson::{to_bson, Bson};
use rocket::{
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A feature area of the application. Access to every protected route is
/// decided by whether the caller's permissions grant its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Module {
    Admin,
    UserManagement,
    Chat,
    Projects,
    Operator,
    Voters,
    Services,
    Beneficiaries,
    Visitors,
    Programme,
    Dashboard,
}

impl Module {
    pub const ALL: [Module; 11] = [
        Module::Admin,
        Module::UserManagement,
        Module::Chat,
        Module::Projects,
        Module::Operator,
        Module::Voters,
        Module::Services,
        Module::Beneficiaries,
        Module::Visitors,
        Module::Programme,
        Module::Dashboard,
    ];

    /// The key used for this module in stored permission maps.
    pub fn key(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::UserManagement => "user-management",
            Self::Chat => "chat",
            Self::Projects => "projects",
            Self::Operator => "operator",
            Self::Voters => "voters",
            Self::Services => "services",
            Self::Beneficiaries => "beneficiaries",
            Self::Visitors => "visitors",
            Self::Programme => "programme",
            Self::Dashboard => "dashboard",
        }
    }

    /// Super modules unlock every other module.
    pub fn is_super(self) -> bool {
        matches!(self, Self::Admin | Self::UserManagement)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown module '{0}'")]
pub struct UnknownModule(pub String);

impl FromStr for Module {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.key() == s)
            .ok_or_else(|| UnknownModule(s.to_string()))
    }
}

impl<'a> FromParam<'a> for Module {
    type Error = UnknownModule;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

impl UriDisplay<Path> for Module {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_raw(self.key())
    }
}

impl_from_uri_param_identity!([Path] Module);

/// A stored permissions map, keyed by module key.
///
/// Keys are kept as strings so that documents written with retired module
/// names still load; unknown keys simply grant nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<String, bool>);

impl Permissions {
    /// Permissions granting exactly the given modules.
    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> Self {
        Self(
            modules
                .into_iter()
                .map(|m| (m.key().to_string(), true))
                .collect(),
        )
    }

    /// Is the module's own flag set?
    pub fn flag(&self, module: Module) -> bool {
        self.0.get(module.key()).copied().unwrap_or(false)
    }

    /// Is the module granted, either directly or via a super module?
    pub fn grants(&self, module: Module) -> bool {
        self.flag(module) || Module::ALL.iter().any(|m| m.is_super() && self.flag(*m))
    }

    /// Every module these permissions grant.
    pub fn granted_modules(&self) -> Vec<Module> {
        Module::ALL
            .into_iter()
            .filter(|m| self.grants(*m))
            .collect()
    }

    /// Reject maps containing keys that are not modules.
    pub fn validate(&self) -> Result<(), UnknownModule> {
        match self.0.keys().find(|key| key.parse::<Module>().is_err()) {
            Some(key) => Err(UnknownModule(key.clone())),
            None => Ok(()),
        }
    }

    /// The permissions in force for a user: their own map if they have one,
    /// otherwise their role's, otherwise nothing.
    pub fn effective<'a>(
        user: Option<&'a Permissions>,
        role: Option<&'a Permissions>,
    ) -> Option<&'a Permissions> {
        user.or(role)
    }
}

impl From<Permissions> for Bson {
    fn from(permissions: Permissions) -> Self {
        to_bson(&permissions).expect("Serialisation is infallible")
    }
}

/// A module a route can be gated on, as a type, so that the gate is part of
/// the handler signature.
pub trait Gate {
    const MODULE: Module;
}

/// Marker types implementing [`Gate`], one per module.
pub mod gate {
    use super::{Gate, Module};

    macro_rules! gates {
        ($($name:ident),+ $(,)?) => {
            $(
                pub struct $name;

                impl Gate for $name {
                    const MODULE: Module = Module::$name;
                }
            )+
        };
    }

    gates!(
        Admin,
        UserManagement,
        Chat,
        Projects,
        Operator,
        Voters,
        Services,
        Beneficiaries,
        Visitors,
        Programme,
        Dashboard,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(pairs: &[(&str, bool)]) -> Permissions {
        Permissions(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        )
    }

    #[test]
    fn keys_round_trip() {
        for module in Module::ALL {
            assert_eq!(module.key().parse::<Module>(), Ok(module));
            let json = rocket::serde::json::serde_json::to_string(&module).unwrap();
            assert_eq!(json, format!("\"{}\"", module.key()));
        }
        assert!("superuser".parse::<Module>().is_err());
    }

    #[test]
    fn plain_module_grants_only_itself() {
        let p = perms(&[("projects", true), ("chat", false)]);
        assert!(p.grants(Module::Projects));
        assert!(!p.grants(Module::Chat));
        assert!(!p.grants(Module::Operator));
        assert_eq!(p.granted_modules(), vec![Module::Projects]);
    }

    #[test]
    fn super_modules_grant_everything() {
        for key in ["admin", "user-management"] {
            let p = perms(&[(key, true)]);
            for module in Module::ALL {
                assert!(p.grants(module), "{key} should grant {module}");
            }
        }
        let disabled = perms(&[("admin", false)]);
        assert!(disabled.granted_modules().is_empty());
    }

    #[test]
    fn unknown_keys_grant_nothing_and_fail_validation() {
        let p = perms(&[("legacy-reports", true)]);
        assert!(p.granted_modules().is_empty());
        assert_eq!(
            p.validate(),
            Err(UnknownModule("legacy-reports".to_string()))
        );
        assert!(Permissions::from_modules([Module::Chat]).validate().is_ok());
    }

    #[test]
    fn user_permissions_override_role() {
        let user = Permissions::from_modules([Module::Visitors]);
        let role = Permissions::from_modules([Module::Admin]);
        let effective = Permissions::effective(Some(&user), Some(&role)).unwrap();
        assert!(!effective.grants(Module::Projects));
        assert!(effective.grants(Module::Visitors));

        let effective = Permissions::effective(None, Some(&role)).unwrap();
        assert!(effective.grants(Module::Projects));
        assert!(Permissions::effective(None, None).is_none());
    }
}
