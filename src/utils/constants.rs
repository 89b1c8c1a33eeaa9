/// Derived column suffixes
pub const LOG_SUFFIX: &str = "_LOG";
pub const RANK_SUFFIX: &str = "_RANK";

/// Output field names
pub const ZIP_FIELD: &str = "ZIP";
pub const REGION_FIELD: &str = "REGION";
pub const PERIOD_END_FIELD: &str = "PERIOD_END";
pub const PROPERTY_TYPE_FIELD: &str = "PROPERTY_TYPE";
pub const ZIP_COUNT_FIELD: &str = "ZIP_COUNT";
pub const TOTAL_POPULATION_FIELD: &str = "TOTAL_POPULATION";
pub const STATE_NAME_FIELD: &str = "STATE_NAME";
pub const COUNTY_NAME_FIELD: &str = "COUNTY_NAME";

/// Metric names
pub const MEDIAN_SALE_PRICE: &str = "MEDIAN_SALE_PRICE";
pub const MEDIAN_SALE_PRICE_YOY: &str = "MEDIAN_SALE_PRICE_YOY";
pub const HOMES_SOLD: &str = "HOMES_SOLD";
pub const INVENTORY: &str = "INVENTORY";
pub const MEDIAN_DOM: &str = "MEDIAN_DOM";

/// Metrics rolled up from ZIP codes to larger geographies
pub const AGGREGATE_METRICS: &[&str] = &[
    MEDIAN_SALE_PRICE,
    MEDIAN_SALE_PRICE_YOY,
    HOMES_SOLD,
    INVENTORY,
    MEDIAN_DOM,
];

/// Right-skewed count/price metrics that get a `_LOG` companion
pub const LOG_TRANSFORM_METRICS: &[&str] = &[
    MEDIAN_SALE_PRICE,
    "MEDIAN_LIST_PRICE",
    "MEDIAN_PPSF",
    "MEDIAN_LIST_PPSF",
    HOMES_SOLD,
    "PENDING_SALES",
    "NEW_LISTINGS",
    INVENTORY,
    MEDIAN_DOM,
];

/// Metrics that get a `_RANK` companion
pub const RANK_METRICS: &[&str] = &[
    MEDIAN_SALE_PRICE,
    MEDIAN_SALE_PRICE_YOY,
    "MEDIAN_LIST_PRICE",
    "MEDIAN_LIST_PRICE_YOY",
    "MEDIAN_PPSF",
    "MEDIAN_PPSF_YOY",
    "MEDIAN_LIST_PPSF",
    "MEDIAN_LIST_PPSF_YOY",
    HOMES_SOLD,
    "HOMES_SOLD_YOY",
    "PENDING_SALES",
    "PENDING_SALES_YOY",
    "NEW_LISTINGS",
    "NEW_LISTINGS_YOY",
    INVENTORY,
    "INVENTORY_YOY",
    MEDIAN_DOM,
    "MEDIAN_DOM_YOY",
    "AVG_SALE_TO_LIST",
    "AVG_SALE_TO_LIST_YOY",
    "SOLD_ABOVE_LIST",
    "SOLD_ABOVE_LIST_YOY",
    "OFF_MARKET_IN_TWO_WEEKS",
    "OFF_MARKET_IN_TWO_WEEKS_YOY",
];

/// Columns coerced to numbers when loading region files (JSON often carries them as strings)
pub const NUMERIC_SUFFIXES: &[&str] = &["", "_MOM", "_YOY"];

/// Columns kept from the ZIP tracker extract
pub const ZIP_KEEP_COLUMNS: &[&str] = &[
    ZIP_FIELD,
    PERIOD_END_FIELD,
    "LATITUDE",
    "LONGITUDE",
    "CITY_NAME",
    "STATE_ABBREV",
    MEDIAN_SALE_PRICE,
    MEDIAN_SALE_PRICE_YOY,
    INVENTORY,
    "INVENTORY_YOY",
    MEDIAN_DOM,
    HOMES_SOLD,
    "SOLD_ABOVE_LIST",
];

/// Single-value, all-null or redundant columns in Redfin region files
pub const REDUNDANT_COLUMNS: &[&str] = &[
    "PERIOD_DURATION",
    "REGION_TYPE",
    "REGION_TYPE_ID",
    "IS_SEASONALLY_ADJUSTED",
    "LAST_UPDATED",
    "PROPERTY_TYPE_ID",
    "PARENT_METRO_REGION_METRO_CODE",
    "CITY",
    "MONTHS_OF_SUPPLY",
    "MONTHS_OF_SUPPLY_MOM",
    "MONTHS_OF_SUPPLY_YOY",
    "PRICE_DROPS",
    "PRICE_DROPS_MOM",
    "PRICE_DROPS_YOY",
];

/// Domain rule defaults
pub const MIN_VALID_PRICE: f64 = 10_000.0;
pub const MAX_VALID_DOM: f64 = 730.0; // 2 years

/// Region files repeat each region once per property type
pub const DEFAULT_PROPERTY_TYPE: &str = "All Residential";

/// ZIP rows older than this many months before the newest period are stale
pub const ZIP_MONTHS_CUTOFF: u32 = 24;

/// ZIP codes are 5 zero-padded digits
pub const ZIP_WIDTH: usize = 5;
pub const COUNTY_FIPS_WIDTH: usize = 5;
pub const STATE_FIPS_WIDTH: usize = 2;

/// Source descriptions
pub const REDFIN_SOURCE: &str = "Redfin Market Tracker";
pub const AGGREGATION_METHOD: &str = "Population-weighted median";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "REDFIN_GEO";

/// Processing defaults
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
