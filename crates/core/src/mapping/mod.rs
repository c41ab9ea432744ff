use serde::{Deserialize, Serialize};

use crate::AudioFrame;

/// Audio feature that can drive a demo option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFeature {
    Bass,
    Mid,
    High,
    Rms,
    Centroid,
    BeatIntensity,
    /// 1.0 on the frame a beat fires, otherwise 0.0.
    Beat,
}

impl AudioFeature {
    /// Extracts this feature from an audio frame.
    pub fn read(self, frame: &AudioFrame) -> f32 {
        match self {
            Self::Bass => frame.analysis.bass,
            Self::Mid => frame.analysis.mid,
            Self::High => frame.analysis.high,
            Self::Rms => frame.analysis.rms,
            Self::Centroid => frame.analysis.spectral_centroid,
            Self::BeatIntensity => frame.beat_intensity,
            Self::Beat => {
                if frame.beat {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Describes how a feature should be routed to a demo option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDescriptor {
    pub source: AudioFeature,
    pub target: String,
    #[serde(default = "unit_gain")]
    pub gain: f32,
}

fn unit_gain() -> f32 {
    1.0
}

impl MappingDescriptor {
    pub fn new(source: AudioFeature, target: impl Into<String>, gain: f32) -> Self {
        Self {
            source,
            target: target.into(),
            gain,
        }
    }
}

/// Evaluates a set of descriptors against each audio frame. The resulting
/// [`ParameterUpdate`]s are meant for `Runner::set_option`.
#[derive(Debug, Default, Clone)]
pub struct MappingMatrix {
    descriptors: Vec<MappingDescriptor>,
    updates: Vec<ParameterUpdate>,
}

impl MappingMatrix {
    pub fn new(descriptors: Vec<MappingDescriptor>) -> Self {
        Self {
            descriptors,
            updates: Vec::new(),
        }
    }

    /// Routing used by the audio-reactive demo: each band to the option of
    /// the same name, beat intensity to `beat`.
    pub fn band_defaults() -> Self {
        Self::new(vec![
            MappingDescriptor::new(AudioFeature::Bass, "bass", 1.0),
            MappingDescriptor::new(AudioFeature::Mid, "mid", 1.0),
            MappingDescriptor::new(AudioFeature::High, "high", 1.0),
            MappingDescriptor::new(AudioFeature::BeatIntensity, "beat", 1.0),
        ])
    }

    pub fn push(&mut self, descriptor: MappingDescriptor) {
        self.descriptors.push(descriptor);
    }

    /// Returns the configured routes.
    pub fn descriptors(&self) -> &[MappingDescriptor] {
        &self.descriptors
    }

    /// Returns the updates produced by the last evaluation.
    pub fn updates(&self) -> &[ParameterUpdate] {
        &self.updates
    }

    pub fn evaluate(&mut self, frame: &AudioFrame) -> &[ParameterUpdate] {
        self.updates.clear();
        for descriptor in &self.descriptors {
            let value = (descriptor.source.read(frame) * descriptor.gain).clamp(0.0, 1.0);
            self.updates.push(ParameterUpdate {
                target: descriptor.target.clone(),
                value,
            });
        }
        &self.updates
    }
}

/// Concrete value routed to a demo option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub target: String,
    pub value: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnalysisFrame;

    fn frame() -> AudioFrame {
        AudioFrame {
            analysis: AnalysisFrame {
                bass: 0.8,
                mid: 0.4,
                high: 0.1,
                ..Default::default()
            },
            beat: true,
            beat_intensity: 0.6,
            bpm: 120,
        }
    }

    #[test]
    fn band_defaults_route_each_feature() {
        let mut matrix = MappingMatrix::band_defaults();
        let updates = matrix.evaluate(&frame());

        let pairs: Vec<(&str, f32)> = updates.iter().map(|u| (u.target.as_str(), u.value)).collect();
        assert_eq!(
            pairs,
            vec![("bass", 0.8), ("mid", 0.4), ("high", 0.1), ("beat", 0.6)]
        );
    }

    #[test]
    fn gain_is_applied_and_clamped() {
        let mut matrix = MappingMatrix::new(vec![MappingDescriptor::new(AudioFeature::Bass, "zoom", 2.0)]);
        matrix.push(MappingDescriptor::new(AudioFeature::Beat, "flash", 0.5));

        let updates = matrix.evaluate(&frame()).to_vec();
        assert_eq!(updates[0].value, 1.0);
        assert_eq!(updates[1].value, 0.5);
        assert_eq!(matrix.updates().len(), 2);
    }

    #[test]
    fn descriptors_deserialize_with_default_gain() {
        let descriptor: MappingDescriptor =
            serde_json::from_str(r#"{ "source": "beat_intensity", "target": "pulse" }"#).unwrap();
        assert_eq!(descriptor.source, AudioFeature::BeatIntensity);
        assert_eq!(descriptor.gain, 1.0);
    }
}
