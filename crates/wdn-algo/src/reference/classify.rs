//! Device classification of flat link records.

use std::collections::BTreeMap;

use tracing::debug;
use wdn_core::{LinkId, LinkRecord, NetworkData, Options, PumpRecord};

use super::{Candidate, Device, LinkRef};
use crate::error::{BuildError, BuildResult};
use crate::pump_curve::PumpCurve;
use crate::resistance::resistance;

const CHECK_VALVE: &str = "check valve";
const SHUTOFF_VALVE: &str = "shutoff valve";
const VALVE_TAG: &str = "valve type";
const DESIGN_PIPE: &str = "design pipe";

/// Classify every link record of `data` into exactly one device subtype.
pub fn classify_links(data: &NetworkData) -> BuildResult<BTreeMap<LinkId, LinkRef>> {
    let mut links = BTreeMap::new();

    for (id, record) in &data.pipe {
        let link = classify_pipe(*id, record, &data.options)?;
        insert_unique(&mut links, link)?;
    }
    for (id, record) in &data.des_pipe {
        let link = classify_design_pipe(*id, record, &data.options)?;
        insert_unique(&mut links, link)?;
    }
    for (id, record) in &data.short_pipe {
        let matches = predicates(record);
        if !matches.is_empty() {
            return Err(ambiguous(*id, "short pipe", matches));
        }
        insert_unique(&mut links, zero_resistance(*id, record, Device::ShortPipe))?;
    }
    for (id, record) in &data.valve {
        let link = classify_valve(*id, record)?;
        insert_unique(&mut links, link)?;
    }
    for (id, record) in &data.pump {
        insert_unique(&mut links, classify_pump(*id, record)?)?;
    }

    for link in links.values() {
        for node in [link.node_fr, link.node_to] {
            if !data.node.contains_key(&node) {
                return Err(BuildError::InvalidInput(format!(
                    "{} references missing {}",
                    link.id, node
                )));
            }
        }
        if link.node_fr == link.node_to {
            return Err(BuildError::InvalidInput(format!(
                "{} connects {} to itself",
                link.id, link.node_fr
            )));
        }
    }

    debug!(links = links.len(), "classified link records");
    Ok(links)
}

fn insert_unique(links: &mut BTreeMap<LinkId, LinkRef>, link: LinkRef) -> BuildResult<()> {
    if links.contains_key(&link.id) {
        return Err(BuildError::InvalidInput(format!(
            "{} appears in more than one link category",
            link.id
        )));
    }
    links.insert(link.id, link);
    Ok(())
}

/// Subtype predicates set on a record.
fn predicates(record: &LinkRecord) -> Vec<&'static str> {
    let mut matches = Vec::new();
    if record.check_valve {
        matches.push(CHECK_VALVE);
    }
    if record.shutoff_valve {
        matches.push(SHUTOFF_VALVE);
    }
    if record.valve_type.is_some() {
        matches.push(VALVE_TAG);
    }
    if !record.diameters.is_empty() {
        matches.push(DESIGN_PIPE);
    }
    matches
}

fn ambiguous(link: LinkId, base: &'static str, extra: Vec<&'static str>) -> BuildError {
    let mut matches = vec![base];
    matches.extend(extra);
    BuildError::AmbiguousDevice { link, matches }
}

fn classify_pipe(id: LinkId, record: &LinkRecord, options: &Options) -> BuildResult<LinkRef> {
    let matches = predicates(record);
    match matches.as_slice() {
        [] => resistive(id, record, options, Device::Pipe),
        [CHECK_VALVE] => resistive(id, record, options, Device::CheckValve),
        [SHUTOFF_VALVE] => resistive(id, record, options, Device::ShutoffValve),
        [VALVE_TAG] => classify_valve(id, record),
        [DESIGN_PIPE] => classify_design_pipe(id, record, options),
        _ => Err(BuildError::AmbiguousDevice { link: id, matches }),
    }
}

fn classify_design_pipe(id: LinkId, record: &LinkRecord, options: &Options) -> BuildResult<LinkRef> {
    let extra: Vec<&'static str> = predicates(record)
        .into_iter()
        .filter(|p| *p != DESIGN_PIPE)
        .collect();
    if !extra.is_empty() {
        return Err(ambiguous(id, DESIGN_PIPE, extra));
    }
    if record.diameters.is_empty() {
        return Err(BuildError::InvalidInput(format!(
            "design {} has no candidate diameters",
            id
        )));
    }
    let roughness = required(id, "roughness", record.roughness)?;
    let candidates = record
        .diameters
        .iter()
        .map(|option| {
            Ok(Candidate {
                diameter: Some(option.diameter),
                resistance: Some(resistance(id, options, option.diameter, roughness)?),
                cost: record.length * option.unit_cost,
            })
        })
        .collect::<BuildResult<Vec<_>>>()?;
    Ok(link_ref(id, record, Device::DesignPipe, positive_length(id, record)?, candidates))
}

fn classify_valve(id: LinkId, record: &LinkRecord) -> BuildResult<LinkRef> {
    let extra: Vec<&'static str> = predicates(record)
        .into_iter()
        .filter(|p| *p != VALVE_TAG)
        .collect();
    if !extra.is_empty() {
        return Err(ambiguous(id, VALVE_TAG, extra));
    }
    let tag = record.valve_type.as_deref().unwrap_or("");
    let device = match tag.to_lowercase().as_str() {
        "prv" => Device::Regulator {
            setting: required(id, "setting", record.setting)?,
        },
        "tcv" | "gpv" => Device::GenericValve,
        "shutoff" | "isolation" => Device::ShutoffValve,
        _ => {
            return Err(BuildError::UnsupportedValveType {
                link: id,
                tag: tag.to_string(),
            })
        }
    };
    Ok(zero_resistance(id, record, device))
}

fn classify_pump(id: LinkId, record: &PumpRecord) -> BuildResult<LinkRef> {
    let curve = PumpCurve::fit(id, &record.head_curve, record.head_curve_form)?;
    Ok(LinkRef {
        id,
        node_fr: record.node_fr,
        node_to: record.node_to,
        length: 0.0,
        device: Device::Pump {
            curve,
            flow_min_forward: record.flow_min_forward,
        },
        candidates: vec![Candidate::default()],
        flow_direction: wdn_core::FlowDirection::Positive,
        flow_min: None,
        flow_max: record.flow_max,
        max_velocity: None,
    })
}

fn resistive(id: LinkId, record: &LinkRecord, options: &Options, device: Device) -> BuildResult<LinkRef> {
    let diameter = required(id, "diameter", record.diameter)?;
    let roughness = required(id, "roughness", record.roughness)?;
    let candidate = Candidate {
        diameter: Some(diameter),
        resistance: Some(resistance(id, options, diameter, roughness)?),
        cost: 0.0,
    };
    Ok(link_ref(id, record, device, positive_length(id, record)?, vec![candidate]))
}

fn zero_resistance(id: LinkId, record: &LinkRecord, device: Device) -> LinkRef {
    let candidate = Candidate {
        diameter: record.diameter,
        ..Candidate::default()
    };
    link_ref(id, record, device, record.length, vec![candidate])
}

fn link_ref(
    id: LinkId,
    record: &LinkRecord,
    device: Device,
    length: f64,
    candidates: Vec<Candidate>,
) -> LinkRef {
    LinkRef {
        id,
        node_fr: record.node_fr,
        node_to: record.node_to,
        length,
        device,
        candidates,
        flow_direction: record.flow_direction,
        flow_min: record.flow_min,
        flow_max: record.flow_max,
        max_velocity: record.max_velocity,
    }
}

fn required(id: LinkId, field: &str, value: Option<f64>) -> BuildResult<f64> {
    value.ok_or_else(|| BuildError::InvalidInput(format!("{} is missing {}", id, field)))
}

fn positive_length(id: LinkId, record: &LinkRecord) -> BuildResult<f64> {
    if record.length.is_finite() && record.length > 0.0 {
        Ok(record.length)
    } else {
        Err(BuildError::InvalidInput(format!(
            "{} has non-positive length {}",
            id, record.length
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wdn_core::{DiameterOption, Node, NodeId};

    fn two_nodes() -> NetworkData {
        let mut data = NetworkData::new();
        data.node.insert(NodeId::new(1), Node::new(10.0));
        data.node.insert(NodeId::new(2), Node::new(0.0));
        data
    }

    fn pipe() -> LinkRecord {
        LinkRecord::new(NodeId::new(1), NodeId::new(2)).with_pipe(100.0, 0.3, 120.0)
    }

    #[test]
    fn plain_and_flagged_pipes() {
        let mut data = two_nodes();
        data.pipe.insert(LinkId::new(1), pipe());
        let mut check = pipe();
        check.check_valve = true;
        data.pipe.insert(LinkId::new(2), check);
        let mut shutoff = pipe();
        shutoff.shutoff_valve = true;
        data.pipe.insert(LinkId::new(3), shutoff);

        let links = classify_links(&data).unwrap();
        assert_eq!(links[&LinkId::new(1)].device, Device::Pipe);
        assert_eq!(links[&LinkId::new(2)].device, Device::CheckValve);
        assert_eq!(links[&LinkId::new(3)].device, Device::ShutoffValve);
        assert!(links[&LinkId::new(2)].candidates[0].resistance.is_some());
        assert_eq!(
            links[&LinkId::new(3)].candidates[0].resistance,
            links[&LinkId::new(2)].candidates[0].resistance
        );
        assert_eq!(links[&LinkId::new(3)].length, 100.0);
    }

    #[test]
    fn stand_alone_shutoff_valve_has_no_resistance() {
        let mut data = two_nodes();
        let mut valve = LinkRecord::new(NodeId::new(1), NodeId::new(2));
        valve.valve_type = Some("isolation".into());
        data.valve.insert(LinkId::new(4), valve);
        let links = classify_links(&data).unwrap();
        assert_eq!(links[&LinkId::new(4)].device, Device::ShutoffValve);
        assert!(links[&LinkId::new(4)].length_resistance(0).is_none());
    }

    #[test]
    fn check_valve_with_diameters_is_ambiguous() {
        let mut data = two_nodes();
        let mut record = pipe();
        record.check_valve = true;
        record.diameters = vec![DiameterOption {
            diameter: 0.2,
            unit_cost: 1.0,
        }];
        data.pipe.insert(LinkId::new(7), record);
        match classify_links(&data).unwrap_err() {
            BuildError::AmbiguousDevice { link, matches } => {
                assert_eq!(link, LinkId::new(7));
                assert_eq!(matches, vec![CHECK_VALVE, DESIGN_PIPE]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn design_candidates_keep_diameter_order() {
        let mut data = two_nodes();
        let mut record = pipe();
        record.diameter = None;
        record.diameters = vec![
            DiameterOption {
                diameter: 0.3,
                unit_cost: 50.0,
            },
            DiameterOption {
                diameter: 0.1,
                unit_cost: 10.0,
            },
        ];
        data.des_pipe.insert(LinkId::new(1), record);
        let links = classify_links(&data).unwrap();
        let link = &links[&LinkId::new(1)];
        assert_eq!(link.device, Device::DesignPipe);
        let r: Vec<f64> = link.candidates.iter().filter_map(|c| c.resistance).collect();
        // Smaller diameters have larger resistance.
        assert!(r[0] < r[1]);
        assert_eq!(link.candidates[0].cost, 5000.0);
        assert_eq!(link.candidates[1].cost, 1000.0);
    }

    #[test]
    fn valve_tags() {
        let mut data = two_nodes();
        let mut prv = LinkRecord::new(NodeId::new(1), NodeId::new(2));
        prv.valve_type = Some("PRV".into());
        prv.setting = Some(25.0);
        data.valve.insert(LinkId::new(1), prv);
        let mut tcv = LinkRecord::new(NodeId::new(1), NodeId::new(2));
        tcv.valve_type = Some("tcv".into());
        data.valve.insert(LinkId::new(2), tcv);
        let links = classify_links(&data).unwrap();
        assert_eq!(links[&LinkId::new(1)].device, Device::Regulator { setting: 25.0 });
        assert_eq!(links[&LinkId::new(2)].device, Device::GenericValve);

        let mut fcv = LinkRecord::new(NodeId::new(1), NodeId::new(2));
        fcv.valve_type = Some("fcv".into());
        data.valve.insert(LinkId::new(3), fcv);
        assert!(matches!(
            classify_links(&data),
            Err(BuildError::UnsupportedValveType { .. })
        ));
    }

    #[test]
    fn duplicate_ids_and_missing_nodes_are_rejected() {
        let mut data = two_nodes();
        data.pipe.insert(LinkId::new(1), pipe());
        data.short_pipe
            .insert(LinkId::new(1), LinkRecord::new(NodeId::new(1), NodeId::new(2)));
        assert!(matches!(classify_links(&data), Err(BuildError::InvalidInput(_))));

        let mut data = two_nodes();
        data.pipe.insert(
            LinkId::new(1),
            LinkRecord::new(NodeId::new(1), NodeId::new(9)).with_pipe(1.0, 0.1, 100.0),
        );
        let err = classify_links(&data).unwrap_err();
        assert!(err.to_string().contains("Node 9"));
    }
}
