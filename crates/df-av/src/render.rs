//! Slide image preparation.
//!
//! ffmpeg cannot decode SWF, so vector slides are rasterized to PNG with
//! swfrender. Bitmap slides are used as they are.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use df_core::{Error, Result};

use crate::command::{conversion_failure, ToolCommand, ToolRunner};

pub struct SlideRenderer {
    swfrender: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl SlideRenderer {
    pub fn new(swfrender: impl Into<PathBuf>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            swfrender: swfrender.into(),
            runner,
        }
    }

    /// Return a path to an ffmpeg-readable image for `slide`.
    pub async fn render(&self, slide: &Path) -> Result<PathBuf> {
        let ext = slide
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" | "png" => Ok(slide.to_path_buf()),
            "swf" => {
                let png = slide.with_extension("png");
                let mut cmd = ToolCommand::new(&self.swfrender);
                cmd.path_arg(slide).arg("-o").path_arg(&png);

                let output = self.runner.run(&cmd).await?;
                if !output.success() {
                    return Err(conversion_failure(
                        format!("Failed to convert SWF file {}", slide.display()),
                        &cmd,
                        &output,
                    ));
                }
                Ok(png)
            }
            _ => Err(Error::Unsupported(format!(
                "unsupported slide type: {}",
                slide.display()
            ))),
        }
    }

    /// Render every slide, preserving order.
    pub async fn render_all(&self, slides: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut rendered = Vec::with_capacity(slides.len());
        for slide in slides {
            rendered.push(self.render(slide).await?);
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ToolOutput;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeSwfrender {
        code: i32,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolRunner for FakeSwfrender {
        async fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
            self.calls.lock().unwrap().push(cmd.command_line());
            Ok(ToolOutput {
                code: Some(self.code),
                stdout: String::new(),
                stderr: if self.code == 0 { String::new() } else { "Couldn't open s1.swf".into() },
            })
        }
    }

    fn renderer(code: i32) -> (Arc<FakeSwfrender>, SlideRenderer) {
        let fake = Arc::new(FakeSwfrender {
            code,
            calls: Mutex::new(Vec::new()),
        });
        (fake.clone(), SlideRenderer::new("swfrender", fake))
    }

    #[tokio::test]
    async fn bitmaps_pass_through() {
        let (fake, renderer) = renderer(0);
        let slides = vec![PathBuf::from("/s/s1.jpg"), PathBuf::from("/s/s2.PNG")];
        assert_eq!(renderer.render_all(&slides).await.unwrap(), slides);
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn swf_is_rendered_to_png() {
        let (fake, renderer) = renderer(0);
        let png = renderer.render(Path::new("/s/s1.swf")).await.unwrap();
        assert_eq!(png, PathBuf::from("/s/s1.png"));
        assert_eq!(*fake.calls.lock().unwrap(), ["swfrender /s/s1.swf -o /s/s1.png"]);
    }

    #[tokio::test]
    async fn render_failure_is_conversion_error() {
        let (_fake, renderer) = renderer(1);
        let err = renderer.render(Path::new("/s/s1.swf")).await.unwrap_err();
        assert_matches!(
            err,
            Error::Conversion { exit_code: Some(1), ref output, .. } if output.contains("Couldn't open")
        );
    }

    #[tokio::test]
    async fn unknown_format_is_unsupported() {
        let (_fake, renderer) = renderer(0);
        let err = renderer.render(Path::new("/s/s1.pdf")).await.unwrap_err();
        assert_matches!(err, Error::Unsupported(_));
    }
}
