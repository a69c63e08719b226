//! Generated counter class.
//!
//! The instrumented program is compiled together with one generated class
//! that owns the counter array and writes the counts snapshot from a
//! shutdown hook. Its contract mirrors [`super::CounterRuntime`]:
//! plain unsynchronized increments, one write per process, same wire format.

use crate::config::InstrumentConfig;
use std::fmt::Write;
use std::path::PathBuf;

/// System property overriding the snapshot path at run time
pub const SNAPSHOT_PROPERTY: &str = "srcprof.counts";

/// Source text of the counter class sized for `counter_count` counters
#[must_use]
pub fn render_counter_class(config: &InstrumentConfig, counter_count: u32) -> String {
    let mut out = String::new();
    let package = config.counter_package();
    let name = config.counter_simple_name();
    let default_path = java_string(&config.snapshot_file);

    if !package.is_empty() {
        let _ = writeln!(out, "package {package};\n");
    }
    out.push_str("import java.io.BufferedOutputStream;\n");
    out.push_str("import java.io.DataOutputStream;\n");
    out.push_str("import java.io.FileOutputStream;\n");
    out.push_str("import java.io.IOException;\n\n");
    out.push_str("/** Generated by srcprof. Do not edit. */\n");
    let _ = writeln!(out, "public final class {name} {{");
    let _ = writeln!(out, "  private static final long[] COUNTS = new long[{counter_count}];");
    out.push('\n');
    out.push_str("  static {\n");
    out.push_str("    Runtime.getRuntime().addShutdownHook(new Thread(() -> save(\n");
    let _ = writeln!(
        out,
        "        System.getProperty(\"{SNAPSHOT_PROPERTY}\", \"{default_path}\"))));"
    );
    out.push_str("  }\n\n");
    let _ = writeln!(out, "  private {name}() {{ }}\n");
    out.push_str("  public static void inc(int id) {\n");
    out.push_str("    COUNTS[id]++;\n");
    out.push_str("  }\n\n");
    out.push_str("  public static boolean branch(boolean condition, int trueId, int falseId) {\n");
    out.push_str("    COUNTS[condition ? trueId : falseId]++;\n");
    out.push_str("    return condition;\n");
    out.push_str("  }\n\n");
    out.push_str("  private static void save(String path) {\n");
    out.push_str("    try (DataOutputStream out = new DataOutputStream(\n");
    out.push_str("        new BufferedOutputStream(new FileOutputStream(path)))) {\n");
    out.push_str("      out.writeInt(COUNTS.length);\n");
    out.push_str("      for (long count : COUNTS) {\n");
    out.push_str("        out.writeLong(count);\n");
    out.push_str("      }\n");
    out.push_str("    } catch (IOException e) {\n");
    out.push_str("      System.err.println(\"srcprof: cannot write \" + path + \": \" + e);\n");
    out.push_str("    }\n");
    out.push_str("  }\n");
    out.push_str("}\n");
    out
}

/// Relative path of the counter class source inside an output tree
#[must_use]
pub fn counter_class_path(config: &InstrumentConfig) -> PathBuf {
    let mut path: PathBuf = config.counter_package().split('.').filter(|s| !s.is_empty()).collect();
    path.push(format!("{}.java", config.counter_simple_name()));
    path
}

fn java_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}
