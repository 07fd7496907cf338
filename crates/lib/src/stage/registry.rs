//! Build recipes for the five native dependencies.
//!
//! Each stage clones a pinned upstream revision into the target's `src/`
//! directory (skipped when the checkout already exists), then builds and
//! installs into the workspace. All paths are absolute so the commands do
//! not depend on the caller's working directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::StagePlanner;
use super::types::{StageAction, StageId, StageSpec};
use crate::config::{BuildConfig, BuildType, MathBackend};
use crate::consts::ARTIFACT_FILE;
use crate::platform::TargetId;
use crate::toolchain::Toolchain;
use crate::workspace::Workspace;

/// A pinned upstream checkout.
struct Source {
  dir: &'static str,
  url: &'static str,
  branch: Option<&'static str>,
}

const OPENBLAS: Source = Source {
  dir: "OpenBLAS",
  url: "https://github.com/xianyi/OpenBLAS",
  branch: Some("v0.3.20"),
};

const CLAPACK: Source = Source {
  dir: "clapack",
  url: "https://github.com/alphacep/clapack",
  branch: Some("v3.2.1"),
};

const OPENFST: Source = Source {
  dir: "openfst",
  url: "https://github.com/alphacep/openfst",
  branch: None,
};

const KALDI: Source = Source {
  dir: "kaldi",
  url: "https://github.com/alphacep/kaldi",
  branch: Some("vosk-android"),
};

const OPENFST_VERSION: &str = "1.8.0";

/// The production planner: real git, make and cmake invocations.
#[derive(Debug, Clone)]
pub struct NativeStages {
  build_type: BuildType,
  backend: MathBackend,
  mkl_root: Option<PathBuf>,
  make_jobs: usize,
  source_dir: PathBuf,
}

impl NativeStages {
  pub fn from_config(config: &BuildConfig) -> Self {
    Self {
      build_type: config.build_type,
      backend: config.math_backend.resolve(),
      mkl_root: config.mkl_root.clone(),
      make_jobs: config.make_jobs.max(1),
      source_dir: config.source_dir.clone(),
    }
  }

  fn common_env(&self, toolchain: &Toolchain) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("CMAKE_BUILD_TYPE".to_string(), self.build_type.as_str().to_string());
    env.insert(
      "CFLAGS".to_string(),
      format!("{} {}", toolchain.cflags().join(" "), self.build_type.c_flags()),
    );
    env.insert(
      "CXXFLAGS".to_string(),
      format!(
        "{} {} -DFST_NO_DYNAMIC_LINKING",
        toolchain.cflags().join(" "),
        self.build_type.c_flags()
      ),
    );
    env
  }

  fn mathlib(&self, toolchain: &Toolchain, ws: &Workspace) -> StageSpec {
    let local = ws.local_dir();

    if self.backend == MathBackend::Mkl {
      let lib_dir = mkl_lib_dir(self.mkl_root.as_deref().unwrap_or(Path::new("")), toolchain.target());
      return StageSpec::new(StageId::Mathlib, "local/lib/libmkl_core.a", "local").with_actions(vec![
        StageAction::cmd(format!("cp {}/*.a {}/", quote(&lib_dir), quote(&local.join("lib")))),
      ]);
    }

    let src = ws.src_dir().join(OPENBLAS.dir);
    let target = toolchain.target();
    let mut make = format!(
      "make -j{} TARGET={} ONLY_CBLAS=1 HOSTCC=gcc USE_THREAD=0 NUM_THREADS=1 BINARY={} \
       CC=\"$CC\" AR=\"$AR\" RANLIB=\"$RANLIB\"",
      self.make_jobs,
      target.openblas_target(),
      if target.is_64bit() { 64 } else { 32 },
    );
    if target == TargetId::ArmeabiV7a {
      make.push_str(" ARM_SOFTFP_ABI=1");
    }

    StageSpec::new(StageId::Mathlib, "local/lib/libopenblas.a", "local").with_actions(vec![
      clone(&OPENBLAS, &ws.src_dir()),
      StageAction::cmd_in(make, &src),
      StageAction::cmd_in(format!("make install NO_SHARED=1 PREFIX={}", quote(&local)), &src),
    ])
  }

  fn linalg(&self, toolchain: &Toolchain, ws: &Workspace) -> StageSpec {
    let src = ws.src_dir().join(CLAPACK.dir);
    let build = src.join("build");
    let j = self.make_jobs;

    let configure = format!(
      "cmake -S {} -B {} -DCMAKE_TOOLCHAIN_FILE={} -DANDROID_ABI={} -DANDROID_PLATFORM=android-{} \
       -DCMAKE_BUILD_TYPE={}",
      quote(&src),
      quote(&build),
      quote(&toolchain.ndk_root().join("build/cmake/android.toolchain.cmake")),
      toolchain.target(),
      toolchain.api_level(),
      self.build_type,
    );

    StageSpec::new(StageId::Linalg, "local/lib/liblapack.a", "local")
      .with_inputs(&[StageId::Mathlib])
      .with_actions(vec![
        clone(&CLAPACK, &ws.src_dir()),
        StageAction::cmd_in(configure, &src),
        StageAction::cmd_in(
          format!("make -j{j} -C F2CLIBS/libf2c && make -j{j} -C BLAS/SRC && make -j{j} -C SRC"),
          &build,
        ),
        StageAction::cmd_in(
          format!("find . -name '*.a' -exec cp {{}} {}/ \\;", quote(&ws.local_dir().join("lib"))),
          &build,
        ),
      ])
  }

  fn transducer(&self, toolchain: &Toolchain, ws: &Workspace) -> StageSpec {
    let src = ws.src_dir().join(OPENFST.dir);
    let configure = format!(
      "./configure --prefix={} --host={} --enable-shared=no --enable-static --with-pic --disable-bin \
       --enable-lookahead-fsts --enable-ngram-fsts",
      quote(&ws.local_dir()),
      toolchain.triple(),
    );

    StageSpec::new(StageId::Transducer, "local/lib/libfst.a", "local").with_actions(vec![
      clone(&OPENFST, &ws.src_dir()),
      StageAction::cmd_in("autoreconf -i", &src),
      StageAction::cmd_in(configure, &src),
      StageAction::cmd_in(format!("make -j{}", self.make_jobs), &src),
      StageAction::cmd_in("make install", &src),
    ])
  }

  fn recognizer(&self, toolchain: &Toolchain, ws: &Workspace) -> StageSpec {
    let kaldi_src = ws.path("kaldi/src");
    let local = ws.local_dir();

    let mathlib = match self.backend {
      MathBackend::Mkl => format!(
        "--mathlib=MKL --mkl-root={}",
        quote(self.mkl_root.as_deref().unwrap_or(Path::new("")))
      ),
      _ => format!(
        "--mathlib=OPENBLAS_CLAPACK --openblas-root={} --clapack-root={}",
        quote(&local),
        quote(&local)
      ),
    };
    let configure = format!(
      "./configure --use-cuda=no --shared {mathlib} --android-incdir={} --host={} --fst-root={} \
       --fst-version={OPENFST_VERSION}",
      quote(&toolchain.sysroot().join("usr/include")),
      toolchain.triple(),
      quote(&local),
    );

    StageSpec::new(StageId::Recognizer, "kaldi/src/online2/kaldi-online2.a", "kaldi")
      .with_inputs(&[StageId::Mathlib, StageId::Linalg, StageId::Transducer])
      .with_actions(vec![
        clone(&KALDI, ws.root()),
        StageAction::cmd_in(configure, &kaldi_src),
        StageAction::cmd_in(format!("make -j{} depend", self.make_jobs), &kaldi_src),
        StageAction::cmd_in(format!("make -j{} online2 rnnlm", self.make_jobs), &kaldi_src),
      ])
  }

  fn targetlib(&self, ws: &Workspace) -> StageSpec {
    let vosk = ws.path("vosk");
    let local = ws.local_dir();

    let backend_flags = match self.backend {
      MathBackend::Mkl => format!(
        "HAVE_MKL=1 MKL_ROOT={}",
        quote(self.mkl_root.as_deref().unwrap_or(Path::new("")))
      ),
      _ => format!("HAVE_OPENBLAS_CLAPACK=1 OPENBLAS_ROOT={}", quote(&local)),
    };
    let make = format!(
      "make -j{} KALDI_ROOT={} OPENFST_ROOT={} {backend_flags} CXX=\"$CXX\" \
       EXTRA_LDFLAGS=\"$LDFLAGS -Wl,-soname,{ARTIFACT_FILE}\"",
      self.make_jobs,
      quote(&ws.path("kaldi")),
      quote(&local),
    );

    let artifact = Path::new("vosk").join(ARTIFACT_FILE);
    StageSpec::new(StageId::Targetlib, &artifact, &artifact)
      .with_inputs(&[StageId::Mathlib, StageId::Transducer, StageId::Recognizer])
      .with_actions(vec![
        StageAction::CopyTree {
          from: self.source_dir.clone(),
          to: vosk.clone(),
        },
        StageAction::cmd_in(make, &vosk),
      ])
  }
}

impl StagePlanner for NativeStages {
  fn plan(&self, toolchain: &Toolchain, workspace: &Workspace) -> Vec<StageSpec> {
    let env = self.common_env(toolchain);
    let specs = vec![
      self.mathlib(toolchain, workspace),
      self.linalg(toolchain, workspace),
      self.transducer(toolchain, workspace),
      self.recognizer(toolchain, workspace),
      self.targetlib(workspace),
    ];

    specs
      .into_iter()
      .map(|mut spec| {
        spec.actions = spec.actions.into_iter().map(|a| a.with_env(&env)).collect();
        spec
      })
      .collect()
  }
}

fn clone(source: &Source, parent: &Path) -> StageAction {
  let dest = parent.join(source.dir);
  let branch = source
    .branch
    .map(|b| format!("-b {b} --single-branch "))
    .unwrap_or_default();
  StageAction::cmd(format!(
    "[ -d {dest} ] || git clone --depth 1 {branch}{url} {dest}",
    dest = quote(&dest),
    url = source.url,
  ))
}

fn mkl_lib_dir(mkl_root: &Path, target: TargetId) -> PathBuf {
  if target.is_64bit() {
    mkl_root.join("lib/intel64")
  } else {
    mkl_root.join("lib/ia32")
  }
}

/// Single-quote a path for `/bin/sh`.
fn quote(path: &Path) -> String {
  format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}
