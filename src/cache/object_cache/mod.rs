pub mod moka;

use std::sync::Once;

static REGISTER_BUILTIN: Once = Once::new();

/// 注册内置缓存后端（重复调用无副作用）
pub fn register_builtin_plugins() {
    REGISTER_BUILTIN.call_once(|| {
        moka::register_plugin();
    });
}
