use crate::bounds::Interval;
use crate::error::BuildResult;
use crate::model::{SymbolicModel, VarKey};
use crate::reference::{demand_range, Device};

use super::TemplateInput;

/// Declare the variables of every component with their bounds.
pub fn declare_variables(model: &mut SymbolicModel, input: &TemplateInput<'_>) -> BuildResult<()> {
    let reference = input.reference;
    let bounds = input.bounds;
    let directed = input.formulation().is_directed();
    let indicator = input.indicator_kind();

    for id in reference.nodes.keys() {
        model.add_continuous(VarKey::Head(*id), bounds.head(*id)?)?;
    }

    for link in reference.links.values() {
        let id = link.id;
        let q = bounds.link_flow(id)?;
        model.add_continuous(VarKey::Flow(id), q)?;

        let bidirectional = matches!(
            link.device,
            Device::Pipe | Device::ShortPipe | Device::DesignPipe
        );
        // A pipe fitted with a shutoff valve keeps its friction in both directions.
        let resistive_shutoff = matches!(link.device, Device::ShutoffValve)
            && link.length_resistance(0).is_some_and(|lr| lr > 0.0);

        if directed {
            let (lower, upper) = if bidirectional {
                (
                    if q.min > 0.0 { 1.0 } else { 0.0 },
                    if q.max < 0.0 { 0.0 } else { 1.0 },
                )
            } else {
                (0.0, 1.0)
            };
            model.add_variable(VarKey::Direction(id), indicator, lower, upper)?;
            if bidirectional || resistive_shutoff {
                model.add_continuous(VarKey::FlowPos(id), Interval::new(0.0, q.max.max(0.0)))?;
                model.add_continuous(VarKey::FlowNeg(id), Interval::new(0.0, (-q.min).max(0.0)))?;
            }
            if matches!(link.device, Device::Pipe | Device::DesignPipe) || resistive_shutoff {
                let dh = bounds.head_difference(link)?;
                model.add_continuous(
                    VarKey::HeadDiffPos(id),
                    Interval::new(0.0, dh.max.max(0.0)),
                )?;
                model.add_continuous(
                    VarKey::HeadDiffNeg(id),
                    Interval::new(0.0, (-dh.min).max(0.0)),
                )?;
            }
        }

        if link.device.is_switchable() {
            model.add_variable(VarKey::Status(id), indicator, 0.0, 1.0)?;
        }

        match &link.device {
            Device::ShutoffValve => {
                model.add_variable(VarKey::OpenForward(id), indicator, 0.0, 1.0)?;
                model.add_variable(VarKey::OpenReverse(id), indicator, 0.0, 1.0)?;
            }
            Device::Pump { .. } => {
                model.add_continuous(VarKey::HeadGain(id), bounds.pump_head_gain(id)?)?;
            }
            Device::DesignPipe => {
                for (k, qk) in bounds.candidate_flows(id)?.iter().enumerate() {
                    model.add_continuous(
                        VarKey::CandidateFlow(id, k),
                        Interval::new(qk.min.min(0.0), qk.max.max(0.0)),
                    )?;
                    model.add_variable(VarKey::Selection(id, k), indicator, 0.0, 1.0)?;
                    if directed {
                        model.add_continuous(
                            VarKey::CandidateFlowPos(id, k),
                            Interval::new(0.0, qk.max.max(0.0)),
                        )?;
                        model.add_continuous(
                            VarKey::CandidateFlowNeg(id, k),
                            Interval::new(0.0, (-qk.min).max(0.0)),
                        )?;
                    }
                }
            }
            _ => {}
        }
    }

    let sum_demand = bounds.sum_demand;
    for id in reference.reservoirs.keys() {
        model.add_continuous(VarKey::ReservoirFlow(*id), Interval::new(0.0, sum_demand))?;
    }
    for id in reference.tanks.keys() {
        model.add_continuous(VarKey::TankFlow(*id), Interval::new(-sum_demand, sum_demand))?;
        model.add_continuous(VarKey::TankVolume(*id), bounds.tank_volume(*id)?)?;
    }
    for id in &reference.dispatchable_demands {
        let (min, max) = demand_range(&reference.demands[id]);
        model.add_continuous(VarKey::DemandFlow(*id), Interval::new(min, max))?;
    }
    Ok(())
}
