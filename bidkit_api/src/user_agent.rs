/// User agent sent with every auction call, e.g. `bidkit/0.3.0`.
pub fn get_user_agent() -> String {
    format!("bidkit/{}", env!("CARGO_PKG_VERSION"))
}
