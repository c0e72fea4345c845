//! Small helpers shared by the prompt builders and loggers.

/// Replace each `{key}` in `tpl` with its value. No escaping, no nesting.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Shorten a payload before it goes into a log line.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_every_occurrence() {
    let out = fill_template("{topic} for {grade}; more {topic}", &[("topic", "Fractions"), ("grade", "Grade 3")]);
    assert_eq!(out, "Fractions for Grade 3; more Fractions");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    let t = trunc_for_log("ééééé", 3);
    assert!(t.starts_with("é…"));
    assert!(t.ends_with("(10 bytes total)"));
  }
}
