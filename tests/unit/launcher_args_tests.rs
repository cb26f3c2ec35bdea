//! Unit tests for the launcher argument defaults derived from terminal
//! state.

use sbtc::client::launcher::effective_arguments;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

// ── Color ───────────────────────────────────────────────────────────────

#[test]
fn tty_stdout_defaults_color_to_always() {
    let out = effective_arguments(&[], true, true);
    assert!(out.contains(&"-Dsbt.color=always".to_owned()));
}

#[test]
fn piped_stdout_defaults_color_to_never() {
    let out = effective_arguments(&[], false, false);
    assert!(out.contains(&"-Dsbt.color=never".to_owned()));
}

#[test]
fn explicit_color_property_suppresses_the_default() {
    let user = args(&["-Dsbt.color=auto"]);
    let out = effective_arguments(&user, true, true);
    let color_flags: Vec<_> = out.iter().filter(|a| a.contains("sbt.color")).collect();
    assert_eq!(color_flags, vec!["-Dsbt.color=auto"]);
}

#[test]
fn explicit_color_flag_suppresses_the_default() {
    let user = args(&["--color=never"]);
    let out = effective_arguments(&user, true, true);
    assert!(
        !out.iter().any(|a| a.starts_with("-Dsbt.color=")),
        "a user --color choice must win: {out:?}"
    );
}

// ── Supershell ──────────────────────────────────────────────────────────

#[test]
fn supershell_requires_both_streams_on_a_terminal() {
    let out = effective_arguments(&[], true, true);
    assert!(out.contains(&"-Dsbt.supershell=true".to_owned()));
}

#[test]
fn supershell_is_disabled_when_stderr_is_piped() {
    let out = effective_arguments(&[], true, false);
    assert!(out.contains(&"-Dsbt.supershell=false".to_owned()));
}

#[test]
fn supershell_is_disabled_when_stdout_is_piped() {
    let out = effective_arguments(&[], false, true);
    assert!(out.contains(&"-Dsbt.supershell=false".to_owned()));
}

#[test]
fn explicit_supershell_choice_suppresses_the_default() {
    let user = args(&["--supershell=always"]);
    let out = effective_arguments(&user, false, false);
    assert!(!out.iter().any(|a| a.starts_with("-Dsbt.supershell=")));
}

// ── Ordering ────────────────────────────────────────────────────────────

#[test]
fn user_arguments_come_first_and_are_preserved() {
    let user = args(&["--no-share", "-Dfoo=bar"]);
    let out = effective_arguments(&user, false, false);
    assert_eq!(&out[..2], &user[..]);
    assert_eq!(out.len(), 4, "defaults are appended after user flags");
}
