mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;

const TWO_SCENES: &str = r#"{
    "scenes": [
        {"kind": "hook", "imageUrl": "img/one.png", "durationSec": 5},
        {"imageUrl": "img/two.png", "durationSec": 3}
    ],
    "settings": {"fps": 30, "includeSubtitle": false}
}"#;

#[test]
fn test_plan_prints_scene_table() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.add_assets(&["img/one.png", "img/two.png"])?;
    env.write_request("promo.json", TWO_SCENES)?;

    let output = utils::run_shortform_command(&env, &["plan", "promo.json"])?;

    assert_eq!(output.exit_code, 0, "plan failed: {}", output.stderr);
    assert!(output.stdout.contains("hook"));
    assert!(output.stdout.contains("body"));
    assert!(output.stdout.contains("5.000s"));
    assert!(output.stdout.contains("Total duration: 8.000s"));
    Ok(())
}

#[test]
fn test_dry_run_prints_every_command() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.add_assets(&["img/one.png", "img/two.png"])?;
    env.write_request("promo.json", TWO_SCENES)?;

    let output = utils::run_shortform_command(&env, &["render", "promo.json", "--dry-run"])?;

    assert_eq!(output.exit_code, 0, "dry run failed: {}", output.stderr);
    let commands: Vec<&str> = output
        .stdout
        .lines()
        .filter(|line| line.starts_with("ffmpeg "))
        .collect();
    // normalize + compose per scene, then one concat
    assert_eq!(commands.len(), 5);
    assert!(commands.iter().any(|line| line.contains("zoompan")));
    assert!(commands.last().unwrap().contains("concat"));
    assert!(!env.path().join("promo.mp4").exists());
    Ok(())
}

#[test]
fn test_scene_without_visual_is_an_input_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_request(
        "bad.json",
        r#"{"scenes": [{"imageUrl": "a.png"}, {"ko1": "자막만 있음"}]}"#,
    )?;

    let output = utils::run_shortform_command(&env, &["--json", "render", "bad.json"])?;

    assert_eq!(output.exit_code, 2);
    let event = output.error_event()?;
    assert_eq!(event["level"], "error");
    assert_eq!(event["data"]["error"], "missing_visual");
    assert_eq!(event["data"]["scene"], 2);
    Ok(())
}

#[test]
fn test_empty_request_is_rejected() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_request("empty.json", r#"{"scenes": [{"promptEn": "nothing here"}]}"#)?;

    let output = utils::run_shortform_command(&env, &["--json", "render", "empty.json"])?;

    assert_eq!(output.exit_code, 2);
    assert_eq!(output.error_event()?["data"]["error"], "no_scenes");
    Ok(())
}

#[test]
fn test_unresolvable_asset_names_scene() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.add_assets(&["img/one.png"])?;
    env.write_request("promo.json", TWO_SCENES)?;

    let output =
        utils::run_shortform_command(&env, &["--json", "render", "promo.json", "--dry-run"])?;

    assert_eq!(output.exit_code, 1);
    let event = output.error_event()?;
    assert_eq!(event["data"]["error"], "asset_resolution");
    assert_eq!(event["data"]["scene"], 2);
    assert_eq!(event["data"]["asset"], "image");
    assert!(!output.stdout.contains("ffmpeg "));
    Ok(())
}

#[test]
fn test_break_tag_matches_scene_pause() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_shortform_command(&env, &["break-tag"])?;

    assert_eq!(output.exit_code, 0);
    assert_eq!(output.stdout.trim(), r#"<break time="400ms"/>"#);
    Ok(())
}
