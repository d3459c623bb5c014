//! Domain capabilities document parser.
//!
//! Input is the libvirt `domainCapabilities` XML:
//!
//! ```text
//! <domainCapabilities>
//!   <cpu>
//!     <mode name='host-model' supported='yes'>
//!       <model fallback='forbid'>Skylake-Client-IBRS</model>
//!       <vendor>Intel</vendor>
//!       <feature policy='require' name='ss'/>
//!     </mode>
//!     <mode name='custom' supported='yes'>
//!       <model usable='yes'>Haswell</model>
//!       <model usable='no'>EPYC</model>
//!     </mode>
//!   </cpu>
//! </domainCapabilities>
//! ```
//!
//! Absent `cpu`, `mode`, `vendor` or `model` elements decode to empty
//! containers. Unknown elements are skipped, and so is a mode-level
//! `feature` entry with no name or an unknown policy.

use tracing::{debug, trace, warn};

use super::features::feature_from_element;
use super::xml::{parse_document, Element};
use super::{CapabilityDocument, CpuMode, CpuModel, ParseError, Usability};

/// Parse a domain capabilities document.
pub fn parse_capabilities(bytes: &[u8]) -> Result<CapabilityDocument, ParseError> {
    let root = parse_document(bytes)?;

    let modes = match root.child("cpu") {
        Some(cpu) => cpu
            .children_named("mode")
            .map(parse_mode)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let doc = CapabilityDocument { modes };
    debug!(
        modes = doc.modes.len(),
        models = doc.models().count(),
        usable = doc.usable_models().len(),
        "parsed capability document"
    );
    Ok(doc)
}

fn parse_mode(element: &Element) -> Result<CpuMode, ParseError> {
    let mut mode = CpuMode {
        name: element.attr("name").unwrap_or_default().to_string(),
        vendor: element
            .child("vendor")
            .map(|v| v.text().to_string())
            .unwrap_or_default(),
        ..CpuMode::default()
    };

    for model in element.children_named("model") {
        let name = model.text();
        if name.is_empty() {
            return Err(ParseError::EmptyModelName);
        }
        if mode.models.iter().any(|m| m.name == name) {
            trace!(mode = %mode.name, model = name, "duplicate model entry ignored");
            continue;
        }
        mode.models.push(CpuModel {
            name: name.to_string(),
            usable: Usability::from_attr(model.attr("usable")),
        });
    }

    // Mode-level features are informational; a bad entry is skipped rather
    // than failing the whole document.
    for feature in element.children_named("feature") {
        match feature_from_element(feature) {
            Ok(feature) => mode.features.push(feature),
            Err(error) => {
                warn!(mode = %mode.name, error = %error, "skipping mode feature entry");
            }
        }
    }

    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domcaps::Policy;

    const DOMCAPS: &str = r#"<domainCapabilities>
  <path>/usr/bin/qemu-system-x86_64</path>
  <domain>kvm</domain>
  <arch>x86_64</arch>
  <cpu>
    <mode name='host-passthrough' supported='yes'/>
    <mode name='host-model' supported='yes'>
      <model fallback='forbid'>Skylake-Client-IBRS</model>
      <vendor>Intel</vendor>
      <feature policy='require' name='ss'/>
      <feature policy='disable' name='mpx'/>
    </mode>
    <mode name='custom' supported='yes'>
      <model usable='yes'>Haswell</model>
      <blockers model='EPYC'>
        <feature name='sse4a'/>
      </blockers>
      <model usable='no'>EPYC</model>
      <model usable='unknown'>Penryn</model>
      <model usable='yes'>Skylake-Client</model>
    </mode>
  </cpu>
</domainCapabilities>"#;

    #[test]
    fn test_parse_modes_and_models() {
        let doc = parse_capabilities(DOMCAPS.as_bytes()).unwrap();

        assert_eq!(doc.modes.len(), 3);

        let passthrough = &doc.modes[0];
        assert_eq!(passthrough.name, "host-passthrough");
        assert_eq!(passthrough.vendor, "");
        assert!(passthrough.models.is_empty());

        let host_model = doc.mode("host-model").unwrap();
        assert_eq!(host_model.vendor, "Intel");
        assert_eq!(host_model.models.len(), 1);
        assert_eq!(host_model.models[0].name, "Skylake-Client-IBRS");
        assert_eq!(host_model.models[0].usable, Usability::Unknown);
        assert_eq!(host_model.features.len(), 2);
        assert_eq!(host_model.features[1].policy, Policy::Disable);

        let custom = doc.mode("custom").unwrap();
        let names: Vec<_> = custom.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Haswell", "EPYC", "Penryn", "Skylake-Client"]);
        assert_eq!(custom.models[1].usable, Usability::No);
        assert_eq!(custom.models[2].usable, Usability::Unknown);

        assert_eq!(doc.usable_models(), vec!["Haswell", "Skylake-Client"]);
    }

    #[test]
    fn test_missing_cpu_element_is_empty() {
        let doc =
            parse_capabilities(b"<domainCapabilities><arch>x86_64</arch></domainCapabilities>")
                .unwrap();
        assert!(doc.modes.is_empty());
        assert!(doc.usable_models().is_empty());
    }

    #[test]
    fn test_empty_mode_is_empty() {
        let doc = parse_capabilities(b"<domainCapabilities><cpu><mode/></cpu></domainCapabilities>")
            .unwrap();
        assert_eq!(doc.modes.len(), 1);
        assert_eq!(doc.modes[0].name, "");
        assert!(doc.modes[0].models.is_empty());
    }

    #[test]
    fn test_duplicate_model_within_mode_keeps_first() {
        let doc = parse_capabilities(
            br#"<domainCapabilities><cpu><mode name='custom'>
<model usable='no'>Haswell</model>
<model usable='yes'>Haswell</model>
</mode></cpu></domainCapabilities>"#,
        )
        .unwrap();
        assert_eq!(doc.modes[0].models.len(), 1);
        assert_eq!(doc.modes[0].models[0].usable, Usability::No);
    }

    #[test]
    fn test_model_name_is_trimmed() {
        let doc = parse_capabilities(
            b"<domainCapabilities><cpu><mode>\
              <model usable='yes'>\n  Haswell \n</model>\
              </mode></cpu></domainCapabilities>",
        )
        .unwrap();
        assert_eq!(doc.usable_models(), vec!["Haswell"]);
    }

    #[test]
    fn test_empty_model_name_is_rejected() {
        let err = parse_capabilities(
            b"<domainCapabilities><cpu><mode>\
              <model usable='yes'/></mode></cpu></domainCapabilities>",
        )
        .unwrap_err();
        assert_eq!(err, ParseError::EmptyModelName);
    }

    #[test]
    fn test_truncated_document_is_rejected() {
        let truncated = &DOMCAPS.as_bytes()[..DOMCAPS.len() / 2];
        let err = parse_capabilities(truncated).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn test_bad_mode_feature_is_skipped() {
        let doc = parse_capabilities(
            br#"<domainCapabilities><cpu>
<mode name='custom'><model usable='yes'>Haswell</model></mode>
<mode name='host-model'>
  <feature policy='sometimes' name='ss'/>
  <feature policy='require'/>
  <feature policy='require' name='vmx'/>
</mode>
</cpu></domainCapabilities>"#,
        )
        .unwrap();

        assert_eq!(doc.usable_models(), vec!["Haswell"]);
        let host = doc.mode("host-model").unwrap();
        assert_eq!(host.features.len(), 1);
        assert_eq!(host.features[0].name, "vmx");
        assert_eq!(host.features[0].policy, Policy::Require);
    }
}
