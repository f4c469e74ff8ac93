//! Ports - コアと外部世界の境界
//!
//! 各 trait は外部の協調者を 1 つずつ隠します（時計、ネットワーク probe、
//! メディアツール、プレゼンテーション層）。テストではスタブに差し替えます。

pub mod clock;
pub mod id_generator;
pub mod listener;
pub mod media;
pub mod probe;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::listener::{ConnectivityListener, NoopTaskListener, TaskListener};
pub use self::media::{Converter, Downloader};
pub use self::probe::ReachabilityProbe;
