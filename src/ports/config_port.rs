//! Configuration access port.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// Section names, lowercase.
    fn sections(&self) -> Vec<String>;

    /// Keys present in `section`, lowercase.
    fn keys(&self, section: &str) -> Vec<String>;
}
