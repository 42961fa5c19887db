//! End-to-end extraction of synthetic packaged binaries.
//!
//! Each test lays out a bootstrap prelude, the serialized props, the payload
//! position line and the payload the same way pkg does, then runs a full pass.

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

use pkg_format::{
    Compression, EntryPointRunner, ExecutionError, ExtractionError, OpenError, PkgFile,
    SeparatorScheme,
};
use tempfile::TempDir;

/// `console.log("brotli");\n` compressed with brotli.
const BROTLI_SCRIPT: &[u8] = &[
    11, 11, 128, 99, 111, 110, 115, 111, 108, 101, 46, 108, 111, 103, 40, 34, 98, 114, 111, 116,
    108, 105, 34, 41, 59, 10, 3,
];

/// Builds a packaged binary from already-serialized props fields and the
/// payload bytes the ranges point into.
fn build_binary(fields: &[&str], payload: &[u8]) -> Vec<u8> {
    let prelude = |position: usize| {
        let mut out = b"\x7fELF\x02\x01\x01 node runtime\n(function () {\n".to_vec();
        out.extend_from_slice(fields.join("\n,\n").as_bytes());
        out.extend_from_slice(b"\n);\n");
        out.extend_from_slice(format!("var PAYLOAD_POSITION = '{:010}' | 0;\n", position).as_bytes());
        out
    };

    let position = prelude(0).len();
    let mut binary = prelude(position);
    binary.extend_from_slice(payload);
    binary
}

fn write_binary(dir: &TempDir, binary: &[u8]) -> PathBuf {
    let path = dir.path().join("app-linux-x64");
    std::fs::write(&path, binary).unwrap();
    path
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[derive(Default)]
struct RecordingRunner {
    calls: RefCell<Vec<(String, Vec<u8>)>>,
}

impl EntryPointRunner for RecordingRunner {
    fn run(&self, entry_point: &str, code: &[u8]) -> Result<(), ExecutionError> {
        self.calls
            .borrow_mut()
            .push((entry_point.to_string(), code.to_vec()));
        Ok(())
    }
}

struct FailingRunner;

impl EntryPointRunner for FailingRunner {
    fn run(&self, _entry_point: &str, _code: &[u8]) -> Result<(), ExecutionError> {
        Err(ExecutionError::Invocation {
            message: "ReferenceError: require is not defined".into(),
        })
    }
}

#[test]
fn unpacks_uncompressed_posix_binary() {
    let dir = TempDir::new().unwrap();
    let payload = b"console.log('hi');\nmodule.exports = 1;\n";
    let binary = build_binary(
        &[
            r#"{"/snapshot/app/index.js":{"1":[0,19],"3":[500,100]},"/snapshot/app":{"2":[600,10],"3":[610,100]},"/snapshot/app/lib/util.js":{"0":[19,20]}}"#,
            r#""/snapshot/app/index.js""#,
            "{}",
            "{}",
            "0",
        ],
        payload,
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    assert_eq!(pkg.compression(), Compression::None);
    assert_eq!(pkg.entry_point(), "/snapshot/app/index.js");

    let stats = pkg.unpack_all(&out, None).unwrap();
    assert_eq!(stats.files_written, 2);
    assert_eq!(stats.bytes_written, 39);
    assert_eq!(stats.entries_skipped, 1);
    assert_eq!(stats.inconsistent, 0);

    assert_eq!(read(&out.join("snapshot/app/index.js")), "console.log('hi');\n");
    assert_eq!(
        read(&out.join("snapshot/app/lib/util.js")),
        "module.exports = 1;\n"
    );
    // Directory entries only produce the directories their files need.
    assert!(out.join("snapshot/app").is_dir());
}

#[test]
fn unpacks_gzip_binary_with_dictionary() {
    let dir = TempDir::new().unwrap();
    let index = gzip(b"require('./lib');\n");
    let lib = gzip(b"exports.lib = true;\n");
    let mut payload = index.clone();
    payload.extend_from_slice(&lib);

    let vfs = format!(
        r#"{{"0/1/2/3":{{"1":[0,{}]}},"0/1/2/4":{{"0":[{},{}]}},"0/1/2":{{"2":[9000,4],"3":[9004,90]}},"0/1":{{"2":[9100,4]}}}}"#,
        index.len(),
        index.len(),
        lib.len()
    );
    let binary = build_binary(
        &[
            &vfs,
            r#""/snapshot/app/index.js""#,
            "{}",
            r#"{"":"0","snapshot":"1","app":"2","index.js":"3","lib.js":"4"}"#,
            "1",
        ],
        &payload,
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    assert_eq!(pkg.compression(), Compression::Gzip);

    let stats = pkg.unpack_all(&out, None).unwrap();
    assert_eq!(stats.files_written, 2);
    assert_eq!(stats.entries_skipped, 2);

    assert_eq!(read(&out.join("snapshot/app/index.js")), "require('./lib');\n");
    assert_eq!(read(&out.join("snapshot/app/lib.js")), "exports.lib = true;\n");
    assert!(!out.join("snapshot/app").is_file());
}

#[cfg(feature = "brotli")]
#[test]
fn unpacks_brotli_binary() {
    let dir = TempDir::new().unwrap();
    let vfs = format!(
        r#"{{"0/1/2":{{"1":[0,{}]}},"0/1":{{"2":[100,4]}}}}"#,
        BROTLI_SCRIPT.len()
    );
    let binary = build_binary(
        &[
            &vfs,
            r#""/snapshot/main.js""#,
            "{}",
            r#"{"":"0","snapshot":"1","main.js":"2"}"#,
            "2",
        ],
        BROTLI_SCRIPT,
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    assert_eq!(pkg.compression(), Compression::Brotli);

    let stats = pkg.unpack_all(&out, None).unwrap();
    assert_eq!(stats.files_written, 1);
    assert_eq!(read(&out.join("snapshot/main.js")), "console.log(\"brotli\");\n");
}

#[test]
fn unpacks_three_field_legacy_binary() {
    let dir = TempDir::new().unwrap();
    let binary = build_binary(
        &[
            r#"{"/snapshot/app.js":{"1":[0,4]},"/snapshot/real/data.json":{"1":[4,2]}}"#,
            r#""/snapshot/app.js""#,
            r#"{"/snapshot/linked":"/snapshot/real"}"#,
        ],
        b"app;{}",
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    assert_eq!(pkg.compression(), Compression::None);
    assert_eq!(pkg.links().len(), 1);
    assert_eq!(
        pkg.resolve_key("/snapshot/linked/data.json").unwrap(),
        "/snapshot/real/data.json"
    );

    let stats = pkg.unpack_all(&out, None).unwrap();
    assert_eq!(stats.files_written, 2);
    assert_eq!(read(&out.join("snapshot/app.js")), "app;");
    assert_eq!(read(&out.join("snapshot/real/data.json")), "{}");
}

#[test]
fn unpacks_dollar_separated_keys() {
    let dir = TempDir::new().unwrap();
    let script = gzip(b"console.log('legacy');\n");
    let vfs = format!(
        r#"{{"0$1$2$3":{{"0":[0,{}],"3":[9000,99]}},"0$1$2":{{"2":[9100,32]}},"0$1":{{"2":[9200,34]}}}}"#,
        script.len()
    );
    let binary = build_binary(
        &[
            &vfs,
            r#""/snapshot/vercel_pkg/index.js""#,
            "{}",
            r#"{"":"0","snapshot":"1","vercel_pkg":"2","index.js":"3"}"#,
            "1",
        ],
        &script,
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    let stats = pkg.unpack_all(&out, None).unwrap();

    assert_eq!(stats.files_written, 1);
    assert_eq!(stats.inconsistent, 0);
    assert_eq!(
        read(&out.join("snapshot/vercel_pkg/index.js")),
        "console.log('legacy');\n"
    );
}

#[test]
fn unpacks_windows_binary_without_drive() {
    let dir = TempDir::new().unwrap();
    let script = gzip(b"process.exit(0);\n");
    let vfs = format!(
        r#"{{"0/1/2/3":{{"0":[0,{}],"3":[900,99]}},"0/1/2":{{"2":[950,32]}}}}"#,
        script.len()
    );
    let binary = build_binary(
        &[
            &vfs,
            r#""C:\\snapshot\\pkg\\index.js""#,
            "{}",
            r#"{"C:":"0","snapshot":"1","pkg":"2","index.js":"3"}"#,
            "1",
        ],
        &script,
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let runner = RecordingRunner::default();
    let mut pkg = PkgFile::open(&path).unwrap();
    let stats = pkg.unpack_all(&out, Some(&runner)).unwrap();

    assert_eq!(stats.files_written, 1);
    assert!(stats.entry_point_executed);
    assert_eq!(runner.calls.borrow()[0].0, r"C:\snapshot\pkg\index.js");
    assert_eq!(read(&out.join("snapshot/pkg/index.js")), "process.exit(0);\n");
}

#[test]
fn dollar_in_plain_file_name_keeps_native_keys() {
    let dir = TempDir::new().unwrap();
    let binary = build_binary(
        &[
            r#"{"/snapshot/app/index.js":{"1":[0,5]},"/snapshot/app/node_modules/x/$helpers.js":{"1":[5,4]}}"#,
            r#""/snapshot/app/index.js""#,
            "{}",
            "{}",
            "0",
        ],
        b"main;help",
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    assert_eq!(pkg.codec().scheme(), SeparatorScheme::Native);

    let stats = pkg.unpack_all(&out, None).unwrap();
    assert_eq!(stats.files_written, 2);
    assert_eq!(stats.inconsistent, 0);
    assert_eq!(read(&out.join("snapshot/app/index.js")), "main;");
    assert_eq!(
        read(&out.join("snapshot/app/node_modules/x/$helpers.js")),
        "help"
    );
}

#[test]
fn follows_symlinks_in_compressed_binary() {
    let dir = TempDir::new().unwrap();
    let script = gzip(b"require('./real');\n");
    let vfs = format!(
        r#"{{"0/1/3/4":{{"1":[0,{}]}},"0/1/3":{{"2":[900,8]}},"0/1":{{"2":[950,8]}}}}"#,
        script.len()
    );
    let binary = build_binary(
        &[
            &vfs,
            r#""/snapshot/app/index.js""#,
            r#"{"0/1/2":"0/1/3"}"#,
            r#"{"":"0","snapshot":"1","app":"2","real":"3","index.js":"4"}"#,
            "1",
        ],
        &script,
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let runner = RecordingRunner::default();
    let mut pkg = PkgFile::open(&path).unwrap();
    assert_eq!(pkg.logical_path("0/1/3/4").unwrap(), "/snapshot/app/index.js");

    let stats = pkg.unpack_all(&out, Some(&runner)).unwrap();
    assert_eq!(stats.inconsistent, 0);
    assert_eq!(stats.files_written, 1);
    assert_eq!(stats.entries_skipped, 2);
    assert!(stats.entry_point_executed);
    assert_eq!(runner.calls.borrow()[0].1, b"require('./real');\n");
    assert_eq!(read(&out.join("snapshot/app/index.js")), "require('./real');\n");
}

#[test]
fn content_at_root_path_is_skipped() {
    let dir = TempDir::new().unwrap();
    let binary = build_binary(
        &[
            r#"{"/":{"1":[0,4]},"/snapshot/a.js":{"1":[4,2]}}"#,
            r#""/snapshot/a.js""#,
            "{}",
        ],
        b"roota;",
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    let stats = pkg.unpack_all(&out, None).unwrap();

    assert_eq!(stats.entries_skipped, 1);
    assert_eq!(stats.files_written, 1);
    assert!(out.is_dir());
    assert_eq!(read(&out.join("snapshot/a.js")), "a;");
}

#[test]
fn missing_payload_marker_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut binary = b"prelude\n".to_vec();
    binary.extend_from_slice(b"{}\n,\n\"/snapshot/a.js\"\n,\n{}\n);\n");
    let path = write_binary(&dir, &binary);

    match PkgFile::open(&path) {
        Err(OpenError::Extraction(ExtractionError::MissingPayloadMarker)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn missing_props_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_binary(&dir, b"just a binary\nvar PAYLOAD_POSITION = 10\n");

    match PkgFile::open(&path) {
        Err(OpenError::Extraction(ExtractionError::MissingProps)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn broken_field_is_fatal() {
    let dir = TempDir::new().unwrap();
    let binary = build_binary(&[r#"{"/a":{"1":[0,"x"]}}"#, r#""/a""#, "{}"], b"");
    let path = write_binary(&dir, &binary);

    let err = PkgFile::open(&path).unwrap_err();
    assert!(matches!(err, OpenError::Parse(_)), "{:?}", err);
}

#[test]
fn missing_input_is_a_read_failure() {
    let dir = TempDir::new().unwrap();
    let err = PkgFile::open(dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, OpenError::ReadFailed(_, _)));
}

#[test]
fn runs_entry_point_once() {
    let dir = TempDir::new().unwrap();
    let binary = build_binary(
        &[
            r#"{"/snapshot/app/index.js":{"1":[0,11]},"/snapshot/app/other.js":{"1":[11,5]}}"#,
            r#""/snapshot/app/index.js""#,
            "{}",
        ],
        b"main();\n//xother",
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let runner = RecordingRunner::default();
    let mut pkg = PkgFile::open(&path).unwrap();
    let stats = pkg.unpack_all(&out, Some(&runner)).unwrap();

    assert!(stats.entry_point_matched);
    assert!(stats.entry_point_executed);
    assert!(!stats.execution_failed);
    let calls = runner.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "/snapshot/app/index.js");
    assert_eq!(calls[0].1, b"main();\n//x");
}

#[test]
fn failing_runner_does_not_abort_the_pass() {
    let dir = TempDir::new().unwrap();
    let binary = build_binary(
        &[
            r#"{"/snapshot/index.js":{"1":[0,3]},"/snapshot/z.js":{"1":[3,3]}}"#,
            r#""/snapshot/index.js""#,
            "{}",
        ],
        b"a()b()",
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    let stats = pkg.unpack_all(&out, Some(&FailingRunner)).unwrap();

    assert!(stats.entry_point_matched);
    assert!(!stats.entry_point_executed);
    assert!(stats.execution_failed);
    assert_eq!(stats.files_written, 2);
    assert_eq!(read(&out.join("snapshot/z.js")), "b()");
}

#[test]
fn unmatched_entry_point_is_not_executed() {
    let dir = TempDir::new().unwrap();
    let binary = build_binary(
        &[
            r#"{"/snapshot/other.js":{"1":[0,3]}}"#,
            r#""/snapshot/index.js""#,
            "{}",
        ],
        b"x()",
    );
    let path = write_binary(&dir, &binary);

    let runner = RecordingRunner::default();
    let mut pkg = PkgFile::open(&path).unwrap();
    let stats = pkg
        .unpack_all(dir.path().join("out"), Some(&runner))
        .unwrap();

    assert!(!stats.entry_point_matched);
    assert!(!stats.entry_point_executed);
    assert!(runner.calls.borrow().is_empty());
    assert_eq!(stats.files_written, 1);
}

#[test]
fn zero_length_and_truncated_entries_are_skipped() {
    let dir = TempDir::new().unwrap();
    let binary = build_binary(
        &[
            r#"{"/snapshot/empty.js":{"1":[0,0]},"/snapshot/cut.js":{"1":[2,400]},"/snapshot/ok.js":{"1":[0,4]}}"#,
            r#""/snapshot/ok.js""#,
            "{}",
        ],
        b"ok()",
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    let stats = pkg.unpack_all(&out, None).unwrap();

    assert_eq!(stats.unreadable, 2);
    assert_eq!(stats.files_written, 1);
    assert!(!out.join("snapshot/empty.js").exists());
    assert!(!out.join("snapshot/cut.js").exists());
    assert_eq!(read(&out.join("snapshot/ok.js")), "ok()");
}

#[test]
fn undecodable_keys_are_counted() {
    let dir = TempDir::new().unwrap();
    let binary = build_binary(
        &[
            r#"{"0/1/2":{"1":[0,2]},"0/9/9":{"1":[2,2]}}"#,
            r#""/snapshot/a.js""#,
            "{}",
            r#"{"":"0","snapshot":"1","a.js":"2"}"#,
            "1",
        ],
        b"a;b;",
    );
    let path = write_binary(&dir, &binary);
    let out = dir.path().join("out");

    let mut pkg = PkgFile::open(&path).unwrap();
    let stats = pkg.unpack_all(&out, None).unwrap();

    assert_eq!(stats.inconsistent, 1);
    assert_eq!(stats.files_written, 1);
    // Stored bytes are not gzip, so they are written as-is.
    assert_eq!(read(&out.join("snapshot/a.js")), "a;");
}
