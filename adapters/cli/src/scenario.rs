//! Scenario files: a session setup plus the towers placed before the first tick.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use hashguard_core::{PlayerCommand, ProtocolId, SessionSetup, SlotId};
use serde::Deserialize;

/// Session described by a TOML scenario file.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Scenario {
    /// Setup the simulation is created from.
    pub(crate) session: SessionSetup,
    /// Opening placements, applied in order.
    #[serde(default)]
    pub(crate) placements: Vec<Placement>,
}

/// Tower placed when a fresh session starts.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Placement {
    pub(crate) protocol: ProtocolId,
    pub(crate) slot: SlotId,
}

impl Placement {
    pub(crate) fn command(&self) -> PlayerCommand {
        PlayerCommand::PlaceTower {
            protocol: self.protocol.clone(),
            slot: self.slot,
        }
    }
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(contents)?;
        scenario
            .session
            .validate()
            .context("scenario setup is inconsistent")?;
        Ok(scenario)
    }
}
