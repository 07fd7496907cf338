pub const APP_NAME: &str = "voxbuild";

/// Lowest Android API level the toolchain templates are generated for.
pub const DEFAULT_API_LEVEL: u32 = 21;

/// Oldest NDK major release whose LLVM layout we understand.
pub const MIN_NDK_MAJOR: u32 = 23;

/// Descriptor file every NDK release ships at its root.
pub const NDK_DESCRIPTOR: &str = "source.properties";

/// File name of the application library produced by the `targetlib` stage.
pub const ARTIFACT_FILE: &str = "libvosk.so";

/// Public header installed next to the library.
pub const PUBLIC_HEADER: &str = "vosk_api.h";

/// Name of the manifest entry inside a package.
pub const PACKAGE_MANIFEST: &str = "manifest.json";

/// Entry points the library must export when post-build tests are enabled.
pub const REQUIRED_EXPORTS: &[&str] = &[
  "vosk_model_new",
  "vosk_recognizer_new",
  "vosk_recognizer_accept_waveform",
  "vosk_recognizer_result",
];
