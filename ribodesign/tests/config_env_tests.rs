// tests/config_env_tests.rs
//
// Note: These tests manipulate environment variables and must run serially.
// Use `cargo test --test config_env_tests -- --test-threads=1` if flaky.

use ribodesign::config::EnvConfig;
use std::sync::Mutex;

// Global mutex to serialize tests that touch environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: [&str; 6] = [
    "RIBODESIGN_MUTATION_THRESHOLD",
    "RIBODESIGN_REWARD_EXPONENT",
    "RIBODESIGN_STATE_RADIUS",
    "RIBODESIGN_USE_CONV",
    "RIBODESIGN_USE_EMBEDDING",
    "RIBODESIGN_DIVERSITY_LOSS",
];

fn clear_vars() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn env_overrides_are_applied() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_vars();

    std::env::set_var("RIBODESIGN_MUTATION_THRESHOLD", "2");
    std::env::set_var("RIBODESIGN_REWARD_EXPONENT", "3.5");
    std::env::set_var("RIBODESIGN_STATE_RADIUS", "4");
    std::env::set_var("RIBODESIGN_USE_CONV", "false");
    std::env::set_var("RIBODESIGN_USE_EMBEDDING", "yes");
    std::env::set_var("RIBODESIGN_DIVERSITY_LOSS", "1");

    let cfg = EnvConfig::from_env();
    assert_eq!(cfg.mutation_threshold, 2);
    assert_eq!(cfg.reward_exponent, 3.5);
    assert_eq!(cfg.state_radius, 4);
    assert!(!cfg.use_conv);
    assert!(cfg.use_embedding);
    assert!(cfg.diversity_loss);
    assert_eq!(cfg.window_len(), 9);

    clear_vars();
}

#[test]
fn unparsable_overrides_keep_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_vars();

    std::env::set_var("RIBODESIGN_STATE_RADIUS", "wide");
    std::env::set_var("RIBODESIGN_REWARD_EXPONENT", "-2");
    std::env::set_var("RIBODESIGN_USE_CONV", "maybe");

    let cfg = EnvConfig::from_env();
    assert_eq!(cfg, EnvConfig::default());

    clear_vars();
}

#[test]
fn env_overrides_apply_on_top_of_yaml() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_vars();

    let mut cfg = EnvConfig::from_yaml_str("state_radius: 2\nmutation_threshold: 7\n").unwrap();
    std::env::set_var("RIBODESIGN_STATE_RADIUS", "6");
    cfg.apply_env_overrides();
    assert_eq!(cfg.state_radius, 6);
    assert_eq!(cfg.mutation_threshold, 7);

    clear_vars();
}
