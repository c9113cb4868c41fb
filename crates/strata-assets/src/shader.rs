//! Shader programs from sectioned GLSL files.
//!
//! A `.glsl` file holds both stages, each introduced by a directive line:
//!
//! ```text
//! #type vertex
//! void main() { ... }
//! #type fragment
//! void main() { ... }
//! ```

use tracing::{debug, warn};

use crate::decoder::{Decoder, DecoderRegistry};
use crate::error::AssetError;
use crate::gpu::{GpuDevice, GpuId, GpuUploader, ShaderStage};
use crate::handle::Handle;
use crate::kind::{AssetKind, PayloadBuilder};
use crate::path::VirtualPath;

const SECTION_DIRECTIVE: &str = "#type";

/// Shader programs under `shaders/`.
pub struct Shader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderRecord {
    pub vertex_source: String,
    pub fragment_source: String,
}

/// A linked program.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderPayload {
    pub program: GpuId,
}

impl AssetKind for Shader {
    type Record = ShaderRecord;
    type Payload = ShaderPayload;

    const NAMESPACE: &'static str = "shaders";
    const DEFAULT_EXTENSION: &'static str = "glsl";

    fn validate(record: &ShaderRecord) -> Result<(), String> {
        if record.vertex_source.trim().is_empty() {
            return Err("vertex stage is empty".into());
        }
        if record.fragment_source.trim().is_empty() {
            return Err("fragment stage is empty".into());
        }
        Ok(())
    }

    fn is_ready(payload: &ShaderPayload) -> bool {
        payload.program.is_valid()
    }

    fn register_default_decoders(registry: &mut DecoderRegistry<Self>) {
        registry.register(&["glsl"], GlslDecoder);
    }
}

/// Splits a sectioned GLSL file into its two stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlslDecoder;

impl GlslDecoder {
    fn stage(name: &str) -> Option<ShaderStage> {
        match name.to_ascii_lowercase().as_str() {
            "vertex" => Some(ShaderStage::Vertex),
            "fragment" | "pixel" => Some(ShaderStage::Fragment),
            _ => None,
        }
    }

    /// Parse `text` into vertex and fragment sources.
    pub fn parse(path: &VirtualPath, text: &str) -> Result<ShaderRecord, AssetError> {
        let mut vertex: Option<String> = None;
        let mut fragment: Option<String> = None;
        let mut current: Option<ShaderStage> = None;

        for (number, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix(SECTION_DIRECTIVE) {
                let name = rest.trim();
                let stage = Self::stage(name).ok_or_else(|| {
                    AssetError::format(path, format!("line {}: unknown stage '{}'", number + 1, name))
                })?;
                let slot = match stage {
                    ShaderStage::Vertex => &mut vertex,
                    ShaderStage::Fragment => &mut fragment,
                };
                if slot.is_some() {
                    return Err(AssetError::format(
                        path,
                        format!("line {}: duplicate {} section", number + 1, stage),
                    ));
                }
                *slot = Some(String::new());
                current = Some(stage);
                continue;
            }

            let slot = match current {
                Some(ShaderStage::Vertex) => &mut vertex,
                Some(ShaderStage::Fragment) => &mut fragment,
                None if trimmed.is_empty() || trimmed.starts_with("//") => continue,
                None => {
                    return Err(AssetError::format(
                        path,
                        format!("line {}: code before the first {} directive", number + 1, SECTION_DIRECTIVE),
                    ))
                }
            };
            if let Some(source) = slot.as_mut() {
                source.push_str(line);
                source.push('\n');
            }
        }

        let vertex_source =
            vertex.ok_or_else(|| AssetError::format(path, "missing vertex section"))?;
        let fragment_source =
            fragment.ok_or_else(|| AssetError::format(path, "missing fragment section"))?;

        Ok(ShaderRecord {
            vertex_source,
            fragment_source,
        })
    }
}

impl Decoder<Shader> for GlslDecoder {
    fn decode(&self, path: &VirtualPath, bytes: &[u8]) -> Result<ShaderRecord, AssetError> {
        let text = std::str::from_utf8(bytes).map_err(|e| AssetError::format(path, e))?;
        Self::parse(path, text)
    }
}

impl<G: GpuDevice> PayloadBuilder<Shader> for GpuUploader<G> {
    fn build(&mut self, path: &VirtualPath, record: ShaderRecord) -> Result<ShaderPayload, AssetError> {
        let gpu = self.gpu();

        let vertex = gpu.compile_shader(ShaderStage::Vertex, &record.vertex_source)?;
        let fragment = match gpu.compile_shader(ShaderStage::Fragment, &record.fragment_source) {
            Ok(id) => id,
            Err(e) => {
                discard(gpu, &[vertex]);
                return Err(e.into());
            }
        };

        let linked = gpu.link_program(vertex, fragment);
        // Stages are no longer needed once linked (or once linking failed).
        discard(gpu, &[vertex, fragment]);
        let program = linked?;

        debug!("Linked shader '{}' as program {}", path, program);
        Ok(ShaderPayload { program })
    }

    fn release(&mut self, payload: ShaderPayload) -> Result<(), AssetError> {
        self.gpu().destroy(payload.program)?;
        Ok(())
    }
}

fn discard<G: GpuDevice>(gpu: &G, ids: &[GpuId]) {
    for &id in ids {
        if let Err(e) = gpu.destroy(id) {
            warn!("Failed to destroy shader stage {}: {}", id, e);
        }
    }
}

impl Handle<Shader> {
    pub fn program(&self) -> Result<GpuId, AssetError> {
        self.read(|s| s.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{FailPoint, GpuError, HeadlessGpu};

    const SOURCE: &str = "\
// basic lit shader
#type vertex
void main() { gl_Position = vec4(0.0); }

#type fragment
void main() { color = vec4(1.0); }
";

    fn path() -> VirtualPath {
        VirtualPath::normalize("shaders", "basic", "glsl").unwrap()
    }

    fn record() -> ShaderRecord {
        GlslDecoder::parse(&path(), SOURCE).unwrap()
    }

    #[test]
    fn splits_sections() {
        let record = record();
        assert!(record.vertex_source.contains("gl_Position"));
        assert!(!record.vertex_source.contains("color"));
        assert!(record.fragment_source.contains("color"));
        assert!(Shader::validate(&record).is_ok());
    }

    #[test]
    fn pixel_is_fragment_alias() {
        let text = "#type vertex\nvoid main() {}\n#type pixel\nvoid main() {}\n";
        let record = GlslDecoder::parse(&path(), text).unwrap();
        assert_eq!(record.fragment_source, "void main() {}\n");
    }

    #[test]
    fn malformed_files_are_format_errors() {
        let cases = [
            "void main() {}\n#type vertex\n",
            "#type vertex\nvoid main() {}\n",
            "#type vertex\na\n#type vertex\nb\n",
            "#type geometry\nvoid main() {}\n",
        ];
        for text in cases {
            assert!(
                matches!(GlslDecoder::parse(&path(), text), Err(AssetError::Format { .. })),
                "accepted: {:?}",
                text
            );
        }
        assert!(GlslDecoder.decode(&path(), &[0xff, 0xfe]).is_err());
    }

    #[test]
    fn build_links_and_drops_stages() {
        let gpu = HeadlessGpu::new();
        let mut uploader = GpuUploader::new(gpu.clone());

        let payload = PayloadBuilder::<Shader>::build(&mut uploader, &path(), record()).unwrap();
        assert!(Shader::is_ready(&payload));
        assert_eq!(gpu.live_objects(), 1);

        PayloadBuilder::<Shader>::release(&mut uploader, payload).unwrap();
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn failed_fragment_leaves_nothing_behind() {
        let gpu = HeadlessGpu::new();
        let mut uploader = GpuUploader::new(gpu.clone());
        gpu.fail_next(FailPoint::Compile(ShaderStage::Fragment));

        let err = PayloadBuilder::<Shader>::build(&mut uploader, &path(), record()).unwrap_err();
        assert!(matches!(
            err,
            AssetError::Gpu(GpuError::CompileFailed {
                stage: ShaderStage::Fragment,
                ..
            })
        ));
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn failed_link_leaves_nothing_behind() {
        let gpu = HeadlessGpu::new();
        let mut uploader = GpuUploader::new(gpu.clone());
        gpu.fail_next(FailPoint::Link);

        assert!(PayloadBuilder::<Shader>::build(&mut uploader, &path(), record()).is_err());
        assert_eq!(gpu.live_objects(), 0);
    }
}
