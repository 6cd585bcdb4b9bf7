use std::{cell::RefCell, str::FromStr};

use crate::disasm::LiteralMode;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Env {
    literals: LiteralMode,
    step_limit: Option<u64>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    set_env(read_env(|name| std::env::var(name).ok()));
}

/// Literal style for dumps, from `LC3VM_LITERALS` (`hex` or `dec`).
pub fn literal_mode() -> LiteralMode {
    with_env(|env| env.literals)
}

/// Default cap on executed instructions, from `LC3VM_STEP_LIMIT`.
pub fn step_limit() -> Option<u64> {
    with_env(|env| env.step_limit)
}

// Unparsable values fall back to the defaults
fn read_env(var: impl Fn(&str) -> Option<String>) -> Env {
    Env {
        literals: var_parse(&var, "LC3VM_LITERALS").unwrap_or_default(),
        step_limit: var_parse(&var, "LC3VM_STEP_LIMIT"),
    }
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_parse<T: FromStr>(var: impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    var(name)?.trim().parse().ok()
}
