//! Bundled profile registry — parses the TOML profiles compiled into the binary.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::types::{AgentRole, ProfileName, PromptProfile};

/// Registry of the bundled prompt profiles.
///
/// The profile set is closed: every profile ships inside the binary and
/// unknown names fail fast rather than falling back to a default.
pub struct ProfileRegistry {
    profiles: HashMap<ProfileName, PromptProfile>,
}

/// A persona/service pairing from the batch catalog.
#[derive(Debug, Clone, Copy)]
pub struct CatalogPair {
    pub persona: ProfileName,
    pub service: ProfileName,
}

impl ProfileRegistry {
    /// Parse all bundled profiles. Fails if any bundled TOML is invalid.
    pub fn new() -> Result<Self> {
        let mut profiles = HashMap::new();

        for name in ProfileName::all() {
            let raw = Self::bundled_toml(*name);
            let profile: PromptProfile =
                toml::from_str(raw).map_err(|e| Error::ProfileInvalid {
                    name: name.slug().to_string(),
                    reason: e.to_string(),
                })?;

            if profile.name != *name {
                return Err(Error::ProfileInvalid {
                    name: name.slug().to_string(),
                    reason: format!("bundled file declares name '{}'", profile.name),
                });
            }

            profiles.insert(*name, profile);
        }

        Ok(Self { profiles })
    }

    /// Get the bundled TOML source for a profile.
    fn bundled_toml(name: ProfileName) -> &'static str {
        match name {
            ProfileName::FrustratedCustomer => {
                include_str!("../../config/profiles/frustrated-customer.toml")
            }
            ProfileName::ConfusedElderly => {
                include_str!("../../config/profiles/confused-elderly.toml")
            }
            ProfileName::AnxiousDiyer => include_str!("../../config/profiles/anxious-diyer.toml"),
            ProfileName::DemandingContractor => {
                include_str!("../../config/profiles/demanding-contractor.toml")
            }
            ProfileName::FrustratedHomeowner => {
                include_str!("../../config/profiles/frustrated-homeowner.toml")
            }
            ProfileName::SupportRep => include_str!("../../config/profiles/support-rep.toml"),
            ProfileName::TechSupport => include_str!("../../config/profiles/tech-support.toml"),
        }
    }

    /// Look up a profile by enum name.
    pub fn get(&self, name: ProfileName) -> &PromptProfile {
        // new() guarantees every variant is present
        &self.profiles[&name]
    }

    /// Look up a profile by string name, failing on unknown names.
    pub fn resolve(&self, name: &str) -> Result<&PromptProfile> {
        let parsed = ProfileName::from_str(name).map_err(|_| Error::unknown_profile(name))?;
        Ok(self.get(parsed))
    }

    /// Resolve a name and require it to play the given role.
    pub fn resolve_role(&self, name: &str, role: AgentRole) -> Result<&PromptProfile> {
        let profile = self.resolve(name)?;
        if profile.role != role {
            return Err(Error::ProfileInvalid {
                name: name.to_string(),
                reason: format!("expected a {} profile, found {}", role, profile.role),
            });
        }
        Ok(profile)
    }

    /// All profiles in catalog order.
    pub fn list(&self) -> Vec<&PromptProfile> {
        ProfileName::all().iter().map(|n| self.get(*n)).collect()
    }

    /// The persona/service pairings covered by a batch run, in order.
    pub fn batch_catalog(&self) -> Vec<CatalogPair> {
        vec![
            CatalogPair {
                persona: ProfileName::FrustratedCustomer,
                service: ProfileName::SupportRep,
            },
            CatalogPair {
                persona: ProfileName::ConfusedElderly,
                service: ProfileName::TechSupport,
            },
            CatalogPair {
                persona: ProfileName::AnxiousDiyer,
                service: ProfileName::TechSupport,
            },
            CatalogPair {
                persona: ProfileName::DemandingContractor,
                service: ProfileName::SupportRep,
            },
            CatalogPair {
                persona: ProfileName::FrustratedHomeowner,
                service: ProfileName::SupportRep,
            },
        ]
    }
}
