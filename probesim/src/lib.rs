/*!
# Probe Simulator

Background traffic over a [`GroundTruthNetwork`]: packets depart from
[`NodeId::SOURCE`] at random intervals and cross the network concurrently,
each on its own flow, before being handed to the [`Sketch`] attached to
the destination.

```no_run
use probesim::{NodeId, PathConfig, Recorder, SimContext};
use std::{sync::Arc, time::Duration};

let mut context = SimContext::new(PathConfig::Double, Some(42)).unwrap();
let recorder = Arc::new(Recorder::new());
context.attach_sketch(NodeId::DESTINATION, recorder.clone()).unwrap();

let report = context
    .simulate_traffic(Duration::from_secs(1), Duration::from_millis(10))
    .unwrap();
context.shutdown().unwrap();

assert_eq!(recorder.len() as u64, report.dispatched);
```
*/

pub mod dispatch;
mod context;
mod recorder;

pub use probesim_core;

// convenient re-export of `probesim_core` core objects
pub use probesim_core::{
    DropProbability, EstimatedParameters, Estimator, GroundTruthNetwork, NodeId, Packet,
    PacketId, PathConfig, Sketch,
};

pub use self::{
    context::{SimContext, SimContextBuilder, TrafficReport},
    dispatch::{Dispatcher, Unbounded, WorkerPool},
    recorder::Recorder,
};
