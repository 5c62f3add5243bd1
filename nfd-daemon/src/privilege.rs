//! Optional privilege drop after the subsystems have bound their sockets.

use nfd_core::{nfd_log_info, nfd_log_init, ConfigTree, Error, Result};
use serde::Deserialize;

nfd_log_init!("PrivilegeHelper");

/// `general` section of the configuration tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralSection {
    /// User name to switch to; empty means stay.
    pub user: Option<String>,
    /// Group name to switch to; empty means stay.
    pub group: Option<String>,
}

/// Effective user/group the daemon switches to; both `None` on Android.
#[derive(Debug, Clone, Default)]
pub struct PrivilegeHelper {
    #[cfg(unix)]
    user: Option<nix::unistd::Uid>,
    #[cfg(unix)]
    group: Option<nix::unistd::Gid>,
}

impl PrivilegeHelper {
    /// Resolve the `general.user` and `general.group` names.
    #[cfg(unix)]
    pub fn from_config(config: &ConfigTree) -> Result<Self> {
        let general: GeneralSection = config.section_as("general")?;
        let user = match non_empty(general.user.as_deref()) {
            Some(name) => Some(resolve_user(name)?),
            None => None,
        };
        let group = match non_empty(general.group.as_deref()) {
            Some(name) => Some(resolve_group(name)?),
            None => None,
        };
        Ok(Self { user, group })
    }

    /// Only an empty `general` section is accepted here.
    #[cfg(not(unix))]
    pub fn from_config(config: &ConfigTree) -> Result<Self> {
        let general: GeneralSection = config.section_as("general")?;
        if general.user.is_some() || general.group.is_some() {
            return Err(Error::privilege("user/group switching is not supported"));
        }
        Ok(Self::default())
    }

    /// True when neither a user nor a group is configured.
    pub fn is_noop(&self) -> bool {
        #[cfg(unix)]
        {
            self.user.is_none() && self.group.is_none()
        }
        #[cfg(not(unix))]
        {
            true
        }
    }

    /// Switch the effective group, then the effective user.
    pub fn drop_privileges(&self) -> Result<()> {
        #[cfg(unix)]
        {
            use nix::unistd::{setegid, seteuid};

            let fail = |call: &str, e: nix::Error| Error::privilege(format!("{call}: {e}"));
            if let Some(gid) = self.group {
                setegid(gid).map_err(|e| fail("setegid", e))?;
            }
            if let Some(uid) = self.user {
                seteuid(uid).map_err(|e| fail("seteuid", e))?;
            }
            if !self.is_noop() {
                nfd_log_info!(
                    "dropped privileges to uid={:?} gid={:?}",
                    self.user,
                    self.group
                );
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn non_empty(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.is_empty())
}

#[cfg(unix)]
fn resolve_user(name: &str) -> Result<nix::unistd::Uid> {
    match nix::unistd::User::from_name(name) {
        Ok(Some(user)) => Ok(user.uid),
        Ok(None) => Err(Error::privilege(format!("no such user '{name}'"))),
        Err(e) => Err(lookup_error(name, e)),
    }
}

#[cfg(unix)]
fn resolve_group(name: &str) -> Result<nix::unistd::Gid> {
    match nix::unistd::Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid),
        Ok(None) => Err(Error::privilege(format!("no such group '{name}'"))),
        Err(e) => Err(lookup_error(name, e)),
    }
}

#[cfg(unix)]
fn lookup_error(name: &str, e: nix::Error) -> Error {
    Error::privilege(format!("cannot resolve '{name}': {e}"))
}
