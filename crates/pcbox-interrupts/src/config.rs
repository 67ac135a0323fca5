//! Board-level configuration of the legacy PIC pair.
//!
//! The same 8259A core serves several board variants: a lone XT-style controller, the usual AT
//! master/slave pair, boards that alias the master across eight ports, and PCI chipsets that
//! take the trigger mode from an ELCR register instead of ICW1.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PicTopology {
    /// A single 8259A (PC/XT). Slave ports are unmapped and lines 8-15 are rejected.
    Single,
    /// Master plus slave cascaded through one master line (PC/AT and later).
    Cascaded,
}

/// Where the edge/level decision for each line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSelect {
    /// A line is level-triggered exactly when its device drives it through `assert_level`.
    Assertion,
    /// ICW1.LTIM of the owning bank (ISA boards).
    Icw1,
    /// The 16-bit edge/level control register at ports 0x4D0/0x4D1 (PCI chipsets).
    Elcr,
}

/// How OCW3's read-register command is decoded on the slave.
///
/// The master always picks IRR or ISR by the RIS bit. Historically the slave treats any
/// read-register command as "read ISR"; some guests were tuned against that behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaveReadSelect {
    InServiceOnLatch,
    ByRis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PicConfig {
    pub topology: PicTopology,
    /// Number of consecutive ports the master decodes starting at 0x20 (2 or 8).
    pub master_alias_span: u16,
    pub trigger_select: TriggerSelect,
    /// Route requests on the cascade line to IRQ9, as AT boards wire the ISA IRQ2 pin.
    ///
    /// Only honored when the cascade sits on line 2.
    pub redirect_irq2: bool,
    pub slave_read_select: SlaveReadSelect,
    /// Start with chipset shadow registers exposed on the PIC ports.
    pub shadow: bool,
}

impl Default for PicConfig {
    fn default() -> Self {
        Self::at()
    }
}

impl PicConfig {
    /// Standard AT master/slave pair at 0x20/0xA0.
    pub fn at() -> Self {
        Self {
            topology: PicTopology::Cascaded,
            master_alias_span: 2,
            trigger_select: TriggerSelect::Assertion,
            redirect_irq2: false,
            slave_read_select: SlaveReadSelect::InServiceOnLatch,
            shadow: false,
        }
    }

    /// Lone PC/XT controller.
    pub fn xt() -> Self {
        Self {
            topology: PicTopology::Single,
            ..Self::at()
        }
    }

    /// Lone controller decoded across 0x20-0x27, as on the PCjr.
    pub fn xt_aliased() -> Self {
        Self {
            master_alias_span: 8,
            ..Self::xt()
        }
    }

    pub fn is_cascaded(&self) -> bool {
        self.topology == PicTopology::Cascaded
    }

    pub fn validate(&self) -> Result<(), PicConfigError> {
        if !matches!(self.master_alias_span, 2 | 8) {
            return Err(PicConfigError::InvalidAliasSpan(self.master_alias_span));
        }
        if self.redirect_irq2 && !self.is_cascaded() {
            return Err(PicConfigError::RedirectWithoutSlave);
        }
        if self.trigger_select == TriggerSelect::Elcr && !self.is_cascaded() {
            return Err(PicConfigError::ElcrWithoutSlave);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PicConfigError {
    #[error("unsupported master alias span {0} (expected 2 or 8)")]
    InvalidAliasSpan(u16),

    #[error("IRQ2 redirection requires a cascaded slave PIC")]
    RedirectWithoutSlave,

    #[error("ELCR trigger selection requires a cascaded slave PIC")]
    ElcrWithoutSlave,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        assert_eq!(PicConfig::at().validate(), Ok(()));
        assert_eq!(PicConfig::xt().validate(), Ok(()));
        assert_eq!(PicConfig::xt_aliased().validate(), Ok(()));
    }

    #[test]
    fn rejects_odd_alias_span() {
        let cfg = PicConfig {
            master_alias_span: 4,
            ..PicConfig::default()
        };
        assert_eq!(cfg.validate(), Err(PicConfigError::InvalidAliasSpan(4)));
    }

    #[test]
    fn rejects_slave_only_options_on_single_pic() {
        let cfg = PicConfig {
            redirect_irq2: true,
            ..PicConfig::xt()
        };
        assert_eq!(cfg.validate(), Err(PicConfigError::RedirectWithoutSlave));

        let cfg = PicConfig {
            trigger_select: TriggerSelect::Elcr,
            ..PicConfig::xt()
        };
        assert_eq!(cfg.validate(), Err(PicConfigError::ElcrWithoutSlave));
    }

    #[test]
    fn json_fills_missing_fields_from_at_defaults() {
        let cfg: PicConfig =
            serde_json::from_str(r#"{ "trigger_select": "elcr", "redirect_irq2": true }"#).unwrap();
        assert_eq!(cfg.topology, PicTopology::Cascaded);
        assert_eq!(cfg.master_alias_span, 2);
        assert_eq!(cfg.trigger_select, TriggerSelect::Elcr);
        assert!(cfg.redirect_irq2);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let err = serde_json::from_str::<PicConfig>(r#"{ "vector": 8 }"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }
}
