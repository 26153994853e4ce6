//! The per-frame pass schedule.
//!
//! A frame is a fixed, ordered list of steps. Render passes name the target
//! they draw into, the targets they sample, and the viewport they use; the
//! renderer walks the list and dispatches each step to the pass that owns
//! its pipeline.

/// A texture slot a pass can draw into or sample from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Full resolution floating point color, with depth.
    Hdr,
    /// One of the two low resolution bloom buffers.
    PingPong(usize),
    /// The swap chain image acquired for this frame.
    Surface,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Viewport {
    /// The window size.
    Full,
    /// The ping-pong buffer size.
    Bloom,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PassKind {
    Scene,
    BrightPassHorizontalBlur,
    VerticalBlur,
    Copy,
    Composite,
}

/// Texture filtering for one sampled source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

impl PassKind {
    /// Only the composite's read of the blurred bloom is filtered; every
    /// other source is sampled texel for texel.
    pub fn filter(self, source: Target) -> Filter {
        match (self, source) {
            (PassKind::Composite, Target::PingPong(_)) => Filter::Linear,
            _ => Filter::Nearest,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassDescriptor {
    pub kind: PassKind,
    pub label: &'static str,
    pub target: Target,
    pub sources: &'static [Target],
    pub viewport: Viewport,
    pub depth: bool,
    /// RGBA the target is cleared to before drawing.
    pub clear: [f64; 4],
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FrameStep {
    Pass(PassDescriptor),
    /// Blocking readback of the HDR target and log-average luminance.
    ComputeLuminance,
}

pub const FRAME_SCHEDULE: [FrameStep; 6] = [
    FrameStep::Pass(PassDescriptor {
        kind: PassKind::Scene,
        label: "Scene Render Pass",
        target: Target::Hdr,
        sources: &[],
        viewport: Viewport::Full,
        depth: true,
        clear: [0.5, 0.5, 0.5, 1.0],
    }),
    FrameStep::ComputeLuminance,
    FrameStep::Pass(PassDescriptor {
        kind: PassKind::BrightPassHorizontalBlur,
        label: "Bright Pass Horizontal Blur Render Pass",
        target: Target::PingPong(0),
        sources: &[Target::Hdr],
        viewport: Viewport::Bloom,
        depth: false,
        clear: [0.0; 4],
    }),
    FrameStep::Pass(PassDescriptor {
        kind: PassKind::VerticalBlur,
        label: "Vertical Blur Render Pass",
        target: Target::PingPong(1),
        sources: &[Target::PingPong(0)],
        viewport: Viewport::Bloom,
        depth: false,
        clear: [0.0; 4],
    }),
    FrameStep::Pass(PassDescriptor {
        kind: PassKind::Copy,
        label: "Bloom Copy Render Pass",
        target: Target::PingPong(0),
        sources: &[Target::PingPong(1)],
        viewport: Viewport::Bloom,
        depth: false,
        clear: [0.0; 4],
    }),
    FrameStep::Pass(PassDescriptor {
        kind: PassKind::Composite,
        label: "Composite Render Pass",
        target: Target::Surface,
        sources: &[Target::Hdr, Target::PingPong(0)],
        viewport: Viewport::Full,
        depth: false,
        clear: [0.0; 4],
    }),
];

/// Passes in schedule order, skipping non-pass steps.
pub fn passes(schedule: &[FrameStep]) -> impl Iterator<Item = &PassDescriptor> {
    schedule.iter().filter_map(|step| match step {
        FrameStep::Pass(pass) => Some(pass),
        FrameStep::ComputeLuminance => None,
    })
}

/// Finds the first pass that samples the target it renders into.
pub fn find_feedback_loop(schedule: &[FrameStep]) -> Option<&PassDescriptor> {
    passes(schedule).find(|pass| pass.sources.contains(&pass.target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds() -> Vec<PassKind> {
        passes(&FRAME_SCHEDULE).map(|pass| pass.kind).collect()
    }

    #[test]
    fn passes_run_in_order() {
        assert_eq!(
            kinds(),
            [
                PassKind::Scene,
                PassKind::BrightPassHorizontalBlur,
                PassKind::VerticalBlur,
                PassKind::Copy,
                PassKind::Composite,
            ]
        );
    }

    #[test]
    fn luminance_sits_between_scene_and_bright_pass() {
        let luminance = FRAME_SCHEDULE
            .iter()
            .position(|step| *step == FrameStep::ComputeLuminance)
            .unwrap();
        assert!(matches!(
            FRAME_SCHEDULE[luminance - 1],
            FrameStep::Pass(PassDescriptor {
                kind: PassKind::Scene,
                ..
            })
        ));
        assert!(matches!(
            FRAME_SCHEDULE[luminance + 1],
            FrameStep::Pass(PassDescriptor {
                kind: PassKind::BrightPassHorizontalBlur,
                ..
            })
        ));
    }

    #[test]
    fn no_pass_samples_its_own_target() {
        assert_eq!(find_feedback_loop(&FRAME_SCHEDULE), None);
    }

    #[test]
    fn feedback_loop_is_detected() {
        const BROKEN: [FrameStep; 1] = [FrameStep::Pass(PassDescriptor {
            kind: PassKind::Copy,
            label: "broken",
            target: Target::PingPong(0),
            sources: &[Target::PingPong(0)],
            viewport: Viewport::Bloom,
            depth: false,
            clear: [0.0; 4],
        })];
        assert!(find_feedback_loop(&BROKEN).is_some());
    }

    #[test]
    fn bloom_passes_use_the_bloom_viewport() {
        for pass in passes(&FRAME_SCHEDULE) {
            let in_bloom_chain = matches!(pass.target, Target::PingPong(_));
            assert_eq!(in_bloom_chain, pass.viewport == Viewport::Bloom, "{}", pass.label);
        }
    }

    #[test]
    fn composite_reads_the_copied_bloom() {
        let all: Vec<_> = passes(&FRAME_SCHEDULE).collect();
        let composite = all.last().unwrap();
        let copy = all[all.len() - 2];
        assert_eq!(composite.target, Target::Surface);
        assert!(composite.sources.contains(&copy.target));
        assert!(composite.sources.contains(&Target::Hdr));
    }

    #[test]
    fn only_the_composite_bloom_read_is_filtered() {
        for pass in passes(&FRAME_SCHEDULE) {
            for source in pass.sources {
                let expected = if pass.kind == PassKind::Composite && *source != Target::Hdr {
                    Filter::Linear
                } else {
                    Filter::Nearest
                };
                assert_eq!(pass.kind.filter(*source), expected, "{} {:?}", pass.label, source);
            }
        }
        assert_eq!(PassKind::BrightPassHorizontalBlur.filter(Target::Hdr), Filter::Nearest);
    }

    #[test]
    fn scene_clears_to_grey_and_the_rest_to_zero() {
        for pass in passes(&FRAME_SCHEDULE) {
            let expected = match pass.kind {
                PassKind::Scene => [0.5, 0.5, 0.5, 1.0],
                _ => [0.0; 4],
            };
            assert_eq!(pass.clear, expected, "{}", pass.label);
        }
    }

    #[test]
    fn only_the_scene_pass_uses_depth() {
        for pass in passes(&FRAME_SCHEDULE) {
            assert_eq!(pass.depth, pass.kind == PassKind::Scene);
        }
    }
}
