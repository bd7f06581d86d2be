//! Model loading and execution on top of tract.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tract_onnx::prelude::*;
use tract_onnx::tract_core::ops::Op;
use tract_onnx::tract_core::plan::{eval, SimpleState};
use tracing::{debug, info, warn};

use crate::config::InputShape;
use crate::error::{OcrError, Result};

type TractSimplePlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Something that runs one synchronous forward pass over a batch.
pub trait InferenceEngine {
    fn infer(&self, batch: &Tensor) -> Result<Arc<Tensor>>;
}

/// Refuses anything but one input and one output.
pub fn ensure_single_io(inputs: usize, outputs: usize) -> Result<()> {
    if inputs != 1 || outputs != 1 {
        return Err(OcrError::Topology { inputs, outputs });
    }
    Ok(())
}

/// Timing of one graph node during a profiled pass.
#[derive(Debug, Clone)]
pub struct PerfCounter {
    pub name: String,
    pub layer_type: String,
    pub exec_type: &'static str,
    pub status: &'static str,
    pub real_time: Duration,
}

/// An optimized, runnable ONNX model with a fixed `(N, C, H, W)` input.
pub struct TractEngine {
    model: TractSimplePlan,
}

impl TractEngine {
    pub fn load(path: &Path, input_shape: InputShape, batch_size: usize) -> Result<Self> {
        if !path.exists() {
            return Err(OcrError::not_found("model", path));
        }
        info!("Loading network file:\n\t{}", path.display());
        let model = tract_onnx::onnx().model_for_path(path)?;
        ensure_single_io(model.input_outlets()?.len(), model.output_outlets()?.len())?;

        let [n, c, h, w] = input_shape.batch_shape(batch_size);
        let model = model.with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(n, c, h, w)),
        )?;
        info!("Loading model to the plugin");
        let model = model.into_optimized()?.into_runnable()?;
        Ok(TractEngine { model })
    }

    /// Runs one extra pass and times every node on its own.
    pub fn perf_counts(&self, batch: &Tensor) -> Result<Vec<PerfCounter>> {
        let mut counters = Vec::new();
        let mut state = SimpleState::new(&self.model)?;
        state.run_plan_with_eval(tvec!(batch.clone()), |session, op_state, node, inputs| {
            let start = Instant::now();
            let outputs = eval(session, op_state, node, inputs);
            counters.push(PerfCounter {
                name: node.name.clone(),
                layer_type: node.op.name().into_owned(),
                exec_type: "tract",
                status: if outputs.is_ok() { "EXECUTED" } else { "FAILED" },
                real_time: start.elapsed(),
            });
            outputs
        })?;
        Ok(counters)
    }
}

impl InferenceEngine for TractEngine {
    fn infer(&self, batch: &Tensor) -> Result<Arc<Tensor>> {
        let outputs = self.model.run(tvec!(batch.clone()))?;
        outputs.into_iter().next().ok_or(OcrError::EmptyOutput)
    }
}

/// Checks optional runtime extension paths. tract ships its kernels
/// statically, so they are only validated and reported. The CPU extension
/// is ignored unless `cpu_requested`.
pub fn check_extensions(
    cpu_requested: bool,
    cpu_extension: Option<&PathBuf>,
    plugin_dir: Option<&PathBuf>,
) -> Result<()> {
    if let Some(path) = cpu_extension {
        if !cpu_requested {
            debug!("CPU extension {} ignored, CPU was not requested", path.display());
        } else if !path.exists() {
            return Err(OcrError::not_found("cpu extension", path));
        } else {
            warn!("CPU extension {} is not used, kernels are built in", path.display());
        }
    }
    if let Some(dir) = plugin_dir {
        if !dir.is_dir() {
            return Err(OcrError::not_found("plugin directory", dir));
        }
        warn!("Plugin directory {} is not used", dir.display());
    }
    Ok(())
}

/// Logs counters as a fixed width table.
pub fn log_perf_counts(counters: &[PerfCounter]) {
    info!("Performance counters:");
    info!(
        "{:<70} {:<15} {:<15} {:<15} {:<10}",
        "name", "layer_type", "exec_type", "status", "real_time, us"
    );
    for counter in counters {
        info!(
            "{:<70} {:<15} {:<15} {:<15} {:<10}",
            counter.name,
            counter.layer_type,
            counter.exec_type,
            counter.status,
            counter.real_time.as_micros()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn single_io_passes() {
        assert!(ensure_single_io(1, 1).is_ok());
    }

    #[test]
    fn multi_io_is_rejected() {
        assert!(matches!(
            ensure_single_io(2, 1),
            Err(OcrError::Topology { inputs: 2, outputs: 1 })
        ));
        assert!(matches!(
            ensure_single_io(1, 3),
            Err(OcrError::Topology { inputs: 1, outputs: 3 })
        ));
        assert!(ensure_single_io(0, 1).is_err());
    }

    // Minimal protobuf writer, enough to spell out an ONNX ModelProto.
    fn varint(buf: &mut Vec<u8>, mut value: u64) {
        while value >= 0x80 {
            buf.push((value as u8) | 0x80);
            value >>= 7;
        }
        buf.push(value as u8);
    }

    fn field_varint(buf: &mut Vec<u8>, field: u64, value: u64) {
        varint(buf, field << 3);
        varint(buf, value);
    }

    fn field_bytes(buf: &mut Vec<u8>, field: u64, bytes: &[u8]) {
        varint(buf, (field << 3) | 2);
        varint(buf, bytes.len() as u64);
        buf.extend_from_slice(bytes);
    }

    fn float_value_info(name: &str) -> Vec<u8> {
        let mut tensor_type = Vec::new();
        field_varint(&mut tensor_type, 1, 1); // elem_type FLOAT
        let mut type_proto = Vec::new();
        field_bytes(&mut type_proto, 1, &tensor_type);
        let mut info = Vec::new();
        field_bytes(&mut info, 1, name.as_bytes());
        field_bytes(&mut info, 2, &type_proto);
        info
    }

    fn identity_node(input: &str, output: &str) -> Vec<u8> {
        let mut node = Vec::new();
        field_bytes(&mut node, 1, input.as_bytes());
        field_bytes(&mut node, 2, output.as_bytes());
        field_bytes(&mut node, 3, output.as_bytes());
        field_bytes(&mut node, 4, b"Identity");
        node
    }

    /// One input `x` fanned out to the given outputs through Identity nodes.
    fn identity_model(outputs: &[&str]) -> Vec<u8> {
        let mut graph = Vec::new();
        for output in outputs {
            field_bytes(&mut graph, 1, &identity_node("x", output));
        }
        field_bytes(&mut graph, 2, b"fan_out");
        field_bytes(&mut graph, 11, &float_value_info("x"));
        for output in outputs {
            field_bytes(&mut graph, 12, &float_value_info(output));
        }

        let mut opset = Vec::new();
        field_bytes(&mut opset, 1, b"");
        field_varint(&mut opset, 2, 13);

        let mut model = Vec::new();
        field_varint(&mut model, 1, 7); // ir_version
        field_bytes(&mut model, 7, &graph);
        field_bytes(&mut model, 8, &opset);
        model
    }

    #[test]
    fn two_output_model_is_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("two_outputs.onnx");
        std::fs::write(&path, identity_model(&["y1", "y2"])).unwrap();

        let result = TractEngine::load(&path, InputShape::default(), 1);
        assert!(matches!(
            result,
            Err(OcrError::Topology { inputs: 1, outputs: 2 })
        ));
    }

    #[test]
    fn missing_model_fails_before_loading() {
        let dir = tempdir().unwrap();
        let result = TractEngine::load(&dir.path().join("absent.onnx"), InputShape::default(), 1);
        assert!(matches!(result, Err(OcrError::NotFound { what: "model", .. })));
    }

    #[test]
    fn extension_paths_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("libcpu_extension.so");
        assert!(check_extensions(true, Some(&missing), None).is_err());
        assert!(check_extensions(true, None, Some(&dir.path().to_path_buf())).is_ok());
        assert!(check_extensions(true, None, None).is_ok());
        assert!(check_extensions(false, None, Some(&missing)).is_err());
    }

    #[test]
    fn cpu_extension_ignored_off_cpu() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("libcpu_extension.so");
        assert!(check_extensions(false, Some(&missing), None).is_ok());
    }
}
