//! # Encoder Command Module
//!
//! Traduce un `ExportJob` negli argomenti ffmpeg:
//! input in ordine di lista, catena di filtri concat sul primo stream video
//! di ogni input, scaling opzionale all'altezza scelta, preset x264 e, solo
//! per il combine, preservazione dei metadata sorgente.

use crate::args;
use crate::encoder::EncoderInvocation;
use crate::export::job::ExportJob;

/// Label of the concatenated stream inside the filter graph
const CONCAT_LABEL: &str = "[v]";
/// Label of the scaled stream inside the filter graph
const SCALED_LABEL: &str = "[v2]";

/// Filter graph joining the first video stream of `inputs` inputs, then
/// optionally scaling to `target_height` with the aspect ratio preserved.
/// Returns the graph and the label to map.
pub fn filter_graph(inputs: usize, target_height: Option<u32>) -> (String, &'static str) {
    let streams: String = (0..inputs).map(|i| format!("[{}:v]", i)).collect();
    let concat = format!("{}concat=n={}:v=1{}", streams, inputs, CONCAT_LABEL);

    match target_height {
        // -2 keeps the width even, which libx264 requires
        Some(height) => (
            format!("{}; {}scale=-2:{}{}", concat, CONCAT_LABEL, height, SCALED_LABEL),
            SCALED_LABEL,
        ),
        None => (concat, CONCAT_LABEL),
    }
}

/// Build the encoder invocation for one job
pub fn build_invocation(job: &ExportJob) -> EncoderInvocation {
    let mut args = Vec::new();

    for item in &job.items {
        args.extend(args!["-i", item.path.to_string_lossy()]);
    }

    let (graph, mapped) = filter_graph(job.items.len(), job.options.target_height);
    args.extend(args![
        "-c:v",
        "libx264",
        "-preset",
        job.options.quality_preset,
        "-filter_complex",
        graph,
        "-map",
        mapped,
    ]);

    if job.preserves_metadata() {
        args.extend(args!["-map_metadata", "0"]);
    }

    EncoderInvocation {
        args,
        output: job.output.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityPreset;
    use crate::export::job::ExportOptions;
    use crate::test_support::item;
    use std::path::PathBuf;

    fn job(names: &[&str], target_height: Option<u32>, batch_mode: bool) -> ExportJob {
        ExportJob {
            items: names.iter().map(|name| item(name, 2)).collect(),
            options: ExportOptions {
                target_height,
                quality_preset: QualityPreset::Veryslow,
                batch_mode,
            },
            output: PathBuf::from("/out/result.mp4"),
        }
    }

    #[test]
    fn test_filter_graph() {
        assert_eq!(filter_graph(1, None), ("[0:v]concat=n=1:v=1[v]".to_string(), "[v]"));
        assert_eq!(
            filter_graph(3, Some(720)),
            ("[0:v][1:v][2:v]concat=n=3:v=1[v]; [v]scale=-2:720[v2]".to_string(), "[v2]")
        );
    }

    #[test]
    fn test_combine_invocation() {
        let invocation = build_invocation(&job(&["a", "b"], Some(480), false));

        assert_eq!(
            invocation.args,
            vec![
                "-i",
                "/videos/a.mp4",
                "-i",
                "/videos/b.mp4",
                "-c:v",
                "libx264",
                "-preset",
                "veryslow",
                "-filter_complex",
                "[0:v][1:v]concat=n=2:v=1[v]; [v]scale=-2:480[v2]",
                "-map",
                "[v2]",
                "-map_metadata",
                "0",
            ]
        );
        assert_eq!(invocation.output, PathBuf::from("/out/result.mp4"));
    }

    #[test]
    fn test_batch_invocation_has_no_metadata_copy() {
        let invocation = build_invocation(&job(&["a"], None, true));

        assert!(!invocation.args.iter().any(|arg| arg == "-map_metadata"));
        let map_at = invocation.args.iter().position(|arg| arg == "-map").unwrap();
        assert_eq!(invocation.args[map_at + 1], "[v]");
    }
}
