mod clockify;

pub use self::clockify::ClockifyAdapter;
