pub mod game_data;
pub mod loader;
pub mod market;
pub mod registry;
pub mod validate;

pub use game_data::{
    difficulty_multiplier, AbilityDetail, AchievementTierDetail, ConsumableDetail,
    ConsumableKind, DungeonInfo, DungeonWave, EquipmentDetail, EquipmentSlot, HouseRoomDetail,
    ItemDetail, MonsterAbility, MonsterCombatDetail, MonsterDetail, RandomSpawnInfo,
    ReferenceData, SpawnEntry, StatBonus, WeaponDetail, ZoneDetail, COIN_HRID,
    MAX_DIFFICULTY_TIER,
};
pub use loader::{
    load_document, load_price_table, load_reference_data, parse_document, LoadError,
    DEFAULT_GAME_DATA_PATH, DEFAULT_MARKET_PATH,
};
pub use market::{MarketPrice, PriceTable};
pub use registry::{DataRegistry, ZoneSummary};
pub use validate::{
    validate_reference_data, validate_reference_file, ValidationDiagnostic, ValidationReport,
    ValidationSeverity,
};
