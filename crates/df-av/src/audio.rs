//! Extract the soundtrack from the talk video.

use std::path::{Path, PathBuf};

use df_core::Result;

use crate::command::{conversion_failure, ToolCommand, ToolRunner};

/// Transcode the audio of `video` into an Ogg Vorbis file at `out`.
pub async fn extract_audio(
    runner: &dyn ToolRunner,
    ffmpeg: &Path,
    video: &Path,
    out: &Path,
) -> Result<PathBuf> {
    tracing::info!("Extracting audio track from {}", video.display());

    let mut cmd = ToolCommand::new(ffmpeg);
    cmd.args(["-v", "error", "-i"]);
    cmd.path_arg(video);
    cmd.args(["-vn", "-acodec", "libvorbis"]);
    cmd.path_arg(out);

    let output = runner.run(&cmd).await?;
    if !output.success() {
        return Err(conversion_failure(
            format!("Failed to extract audio from {}", video.display()),
            &cmd,
            &output,
        ));
    }
    Ok(out.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ToolOutput;
    use async_trait::async_trait;
    use df_core::Error;
    use std::sync::Mutex;

    struct Recorder {
        code: i32,
        args: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolRunner for Recorder {
        async fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
            *self.args.lock().unwrap() = cmd.get_args().to_vec();
            Ok(ToolOutput {
                code: Some(self.code),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn builds_vorbis_extraction() {
        let runner = Recorder {
            code: 0,
            args: Mutex::new(Vec::new()),
        };
        let out = extract_audio(
            &runner,
            Path::new("ffmpeg"),
            Path::new("/s/video.avi"),
            Path::new("/s/audio.ogg"),
        )
        .await
        .unwrap();

        assert_eq!(out, PathBuf::from("/s/audio.ogg"));
        assert_eq!(
            *runner.args.lock().unwrap(),
            ["-v", "error", "-i", "/s/video.avi", "-vn", "-acodec", "libvorbis", "/s/audio.ogg"]
        );
    }

    #[tokio::test]
    async fn failure_is_conversion_error() {
        let runner = Recorder {
            code: 1,
            args: Mutex::new(Vec::new()),
        };
        let err = extract_audio(
            &runner,
            Path::new("ffmpeg"),
            Path::new("/s/video.avi"),
            Path::new("/s/audio.ogg"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Conversion { exit_code: Some(1), .. }));
    }
}
