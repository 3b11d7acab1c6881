//! Version-dependent `contents.xml` emission and extraction.
//!
//! The engine's container XML is deterministic templated text; exact tag
//! casing and ordering are load-bearing for the external tool, so the
//! document is emitted line by line and read back with the same
//! line-oriented scanning used for the report grammar. The two schema
//! versions differ structurally, not just in tag names:
//!
//! - 2.10.1 wraps the curves in `<ModalCurveTarget>` and stores points as
//!   `<StatPoint>` entries
//! - 3.4.2 wraps them in `<DispersionTarget>`, stores points as
//!   `<RealStatisticalPoint>` entries, and additionally carries
//!   `<position>`, `<enabled>`, and a `<MagnetoTelluricTarget>` block
//!
//! Per point, `<x>` is frequency, `<mean>` is slowness, and `<stddev>` is
//! the version's uncertainty half-width (see
//! [`ModalTarget::engine_stddev`]).

use crate::domain::{EngineVersion, WaveType};
use crate::error::{Error, Result};
use crate::io::scan;
use crate::target::{ModalTarget, TargetSet};

fn point_tag(version: EngineVersion) -> &'static str {
    match version {
        EngineVersion::V2 => "StatPoint",
        EngineVersion::V3 => "RealStatisticalPoint",
    }
}

fn target_tag(version: EngineVersion) -> &'static str {
    match version {
        EngineVersion::V2 => "ModalCurveTarget",
        EngineVersion::V3 => "DispersionTarget",
    }
}

/// Render the full `contents.xml` document for a target set.
pub(crate) fn render(set: &TargetSet, version: EngineVersion) -> Result<String> {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<Dinver>\n");
    out.push_str("  <pluginTag>DispersionCurve</pluginTag>\n");
    out.push_str("  <pluginTitle>Surface Wave Inversion</pluginTitle>\n");
    out.push_str("  <TargetList>\n");
    if version == EngineVersion::V3 {
        out.push_str("    <position>0 0 0</position>\n");
    }
    out.push_str(&format!("    <{} type=\"dispersion\">\n", target_tag(version)));
    out.push_str("      <selected>true</selected>\n");
    out.push_str("      <misfitWeight>1</misfitWeight>\n");
    out.push_str("      <minimumMisfit>0</minimumMisfit>\n");
    out.push_str("      <misfitType>L2_Normalized</misfitType>\n");
    for target in set.iter() {
        render_curve(&mut out, target, version)?;
    }
    out.push_str(&format!("    </{}>\n", target_tag(version)));
    if version == EngineVersion::V3 {
        out.push_str("    <MagnetoTelluricTarget>\n");
        out.push_str("      <selected>false</selected>\n");
        out.push_str("      <misfitWeight>1</misfitWeight>\n");
        out.push_str("      <minimumMisfit>0</minimumMisfit>\n");
        out.push_str("      <misfitType>L2_Normalized</misfitType>\n");
        out.push_str("    </MagnetoTelluricTarget>\n");
    }
    out.push_str("  </TargetList>\n");
    out.push_str("</Dinver>\n");
    Ok(out)
}

fn render_curve(out: &mut String, target: &ModalTarget, version: EngineVersion) -> Result<()> {
    out.push_str("      <ModalCurve>\n");
    let (wave, mode) = target.description()[0];
    out.push_str(&format!("        <name>{wave} {mode}</name>\n"));
    out.push_str("        <log>exported dispersion target</log>\n");
    if version == EngineVersion::V3 {
        out.push_str("        <enabled>true</enabled>\n");
    }
    for &(wave, mode) in target.description() {
        out.push_str("        <Mode>\n");
        out.push_str("          <slowness>Phase</slowness>\n");
        out.push_str(&format!("          <polarisation>{wave}</polarisation>\n"));
        out.push_str("          <ringIndex>0</ringIndex>\n");
        out.push_str(&format!("          <index>{mode}</index>\n"));
        out.push_str("        </Mode>\n");
    }
    let tag = point_tag(version);
    for i in 0..target.len() {
        let (f, v, s) = (
            target.frequency()[i],
            target.velocity()[i],
            target.velstd()[i],
        );
        let stddev = ModalTarget::engine_stddev(v, s, version)?;
        out.push_str(&format!("        <{tag}>\n"));
        out.push_str(&format!("          <x>{f}</x>\n"));
        out.push_str(&format!("          <mean>{}</mean>\n", 1.0 / v));
        out.push_str(&format!("          <stddev>{stddev}</stddev>\n"));
        out.push_str("          <weight>1</weight>\n");
        out.push_str("          <valid>true</valid>\n");
        out.push_str(&format!("        </{tag}>\n"));
    }
    out.push_str("      </ModalCurve>\n");
    Ok(())
}

/// In-flight accumulation for one `<ModalCurve>` block.
struct CurveAccum {
    description: Vec<(WaveType, usize)>,
    pending_wave: Option<WaveType>,
    frequency: Vec<f64>,
    velocity: Vec<f64>,
    velstd: Vec<f64>,
    point: Option<(Option<f64>, Option<f64>, Option<f64>)>,
}

impl CurveAccum {
    fn new() -> Self {
        Self {
            description: Vec::new(),
            pending_wave: None,
            frequency: Vec::new(),
            velocity: Vec::new(),
            velstd: Vec::new(),
            point: None,
        }
    }
}

/// Extract every modal curve from a `contents.xml` document.
pub(crate) fn parse(xml: &str, version: EngineVersion) -> Result<TargetSet> {
    let point_open = format!("<{}>", point_tag(version));
    let point_close = format!("</{}>", point_tag(version));

    let mut targets = Vec::new();
    let mut accum: Option<CurveAccum> = None;

    for line in xml.lines() {
        let line = line.trim();
        if line == "<ModalCurve>" {
            accum = Some(CurveAccum::new());
            continue;
        }
        if line == "</ModalCurve>" {
            let Some(acc) = accum.take() else {
                continue;
            };
            if acc.frequency.is_empty() {
                return Err(Error::Format(format!(
                    "modal curve holds no <{}> entries; was this file written for engine {version}?",
                    point_tag(version)
                )));
            }
            targets.push(if acc.description.is_empty() {
                ModalTarget::new(acc.frequency, acc.velocity, acc.velstd)?
            } else {
                ModalTarget::with_description(
                    acc.frequency,
                    acc.velocity,
                    acc.velstd,
                    acc.description,
                )?
            });
            continue;
        }
        let Some(acc) = accum.as_mut() else {
            continue;
        };
        if line == point_open {
            acc.point = Some((None, None, None));
        } else if line == point_close {
            let Some((Some(x), Some(mean), Some(stddev))) = acc.point.take() else {
                return Err(Error::Format(
                    "statistical point without x/mean/stddev values".into(),
                ));
            };
            if mean <= 0.0 {
                return Err(Error::Format(format!("non-positive mean slowness {mean}")));
            }
            let velocity = 1.0 / mean;
            acc.frequency.push(x);
            acc.velocity.push(velocity);
            acc.velstd
                .push(ModalTarget::velstd_from_engine(velocity, stddev, version));
        } else if let Some(point) = acc.point.as_mut() {
            if let Some(text) = tag_text(line, "x") {
                point.0 = Some(parse_float(text)?);
            } else if let Some(text) = tag_text(line, "mean") {
                point.1 = Some(parse_float(text)?);
            } else if let Some(text) = tag_text(line, "stddev") {
                point.2 = Some(parse_float(text)?);
            }
        } else if let Some(text) = tag_text(line, "polarisation") {
            acc.pending_wave = Some(text.trim().parse()?);
        } else if let Some(text) = tag_text(line, "index") {
            if let Some(wave) = acc.pending_wave.take() {
                let mode = text
                    .trim()
                    .parse()
                    .map_err(|_| Error::Format(format!("bad mode index '{text}'")))?;
                acc.description.push((wave, mode));
            }
        }
    }

    if targets.is_empty() {
        return Err(Error::Format("no <ModalCurve> blocks found".into()));
    }
    TargetSet::new(targets)
}

/// The text between `<tag>` and `</tag>` when `line` is exactly that
/// element, without allocation.
fn tag_text<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let rest = line.strip_prefix('<')?.strip_prefix(tag)?.strip_prefix('>')?;
    let end = rest.find("</")?;
    let close = rest[end + 2..].strip_suffix('>')?;
    (close == tag).then(|| &rest[..end])
}

fn parse_float(text: &str) -> Result<f64> {
    scan::float_token(text.trim())
        .ok_or_else(|| Error::Format(format!("bad numeric value '{text}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> TargetSet {
        let a = ModalTarget::with_description(
            vec![1.0, 2.0, 5.0],
            vec![400.0, 300.0, 200.0],
            vec![40.0, 30.0, 20.0],
            vec![(WaveType::Rayleigh, 0), (WaveType::Love, 0)],
        )
        .unwrap();
        let b = ModalTarget::with_description(
            vec![2.0, 4.0],
            vec![350.0, 250.0],
            vec![0.0, 12.5],
            vec![(WaveType::Rayleigh, 1)],
        )
        .unwrap();
        TargetSet::new(vec![a, b]).unwrap()
    }

    #[test]
    fn tag_text_is_exact() {
        assert_eq!(tag_text("<x>1.5</x>", "x"), Some("1.5"));
        assert_eq!(tag_text("<index>2</index>", "index"), Some("2"));
        // ringIndex must not satisfy a lookup for index.
        assert_eq!(tag_text("<ringIndex>0</ringIndex>", "index"), None);
        assert_eq!(tag_text("<x>1.5</y>", "x"), None);
        assert_eq!(tag_text("no tags here", "x"), None);
    }

    #[test]
    fn v2_schema_shape() {
        let xml = render(&set(), EngineVersion::V2).unwrap();
        assert!(xml.contains("<ModalCurveTarget type=\"dispersion\">"));
        assert!(xml.contains("<StatPoint>"));
        assert!(!xml.contains("RealStatisticalPoint"));
        assert!(!xml.contains("<position>"));
        assert!(!xml.contains("<enabled>"));
        assert!(!xml.contains("MagnetoTelluricTarget"));
    }

    #[test]
    fn v3_schema_shape() {
        let xml = render(&set(), EngineVersion::V3).unwrap();
        assert!(xml.contains("<DispersionTarget type=\"dispersion\">"));
        assert!(xml.contains("<RealStatisticalPoint>"));
        assert!(xml.contains("<position>0 0 0</position>"));
        assert!(xml.contains("<enabled>true</enabled>"));
        assert!(xml.contains("<MagnetoTelluricTarget>"));
        assert!(!xml.contains("<StatPoint>"));
    }

    #[test]
    fn render_then_parse_round_trips_each_version() {
        let original = set();
        for version in [EngineVersion::V2, EngineVersion::V3] {
            let xml = render(&original, version).unwrap();
            let back = parse(&xml, version).unwrap();
            assert!(
                back.approx_eq(&original, 1e-9),
                "round trip failed for {version}"
            );
        }
    }

    #[test]
    fn parsing_with_the_wrong_version_fails() {
        let xml = render(&set(), EngineVersion::V2).unwrap();
        assert!(matches!(
            parse(&xml, EngineVersion::V3),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn mode_ambiguity_survives_the_round_trip() {
        let xml = render(&set(), EngineVersion::V2).unwrap();
        let back = parse(&xml, EngineVersion::V2).unwrap();
        assert_eq!(
            back.get(0).unwrap().description(),
            &[(WaveType::Rayleigh, 0), (WaveType::Love, 0)]
        );
        assert_eq!(back.get(1).unwrap().description(), &[(WaveType::Rayleigh, 1)]);
    }

    #[test]
    fn document_without_curves_is_a_format_error() {
        let xml = "<?xml version=\"1.0\"?>\n<Dinver>\n  <TargetList/>\n</Dinver>\n";
        assert!(matches!(
            parse(xml, EngineVersion::V2),
            Err(Error::Format(_))
        ));
    }
}
