//! The warehouse schema as shown to the model. Column notes carry the
//! quirks the model keeps getting wrong (text month names, lowercase
//! regions, the revenue formula).

pub struct TableDoc {
    pub name: &'static str,
    pub description: &'static str,
    pub columns: &'static [(&'static str, &'static str)],
}

pub const SCHEMA_CATALOG: &[TableDoc] = &[
    TableDoc {
        name: "sales",
        description: "Daily sales facts per store and product.",
        columns: &[
            ("store_id", "TEXT, joins location.store_id"),
            ("product_id", "TEXT, joins product_hierarchy.product_id"),
            ("date", "DATE, joins calendar.date"),
            ("sales_units", "NUMERIC, units sold that day"),
            ("total_amount", "NUMERIC, per-unit amount; revenue is SUM(sales_units * total_amount)"),
        ],
    },
    TableDoc {
        name: "metrics",
        description: "Weekly demand forecasts per store and product.",
        columns: &[
            ("store_id", "TEXT"),
            ("product_id", "TEXT"),
            ("week_end_date", "DATE, last day of the forecast week"),
            ("metric", "NUMERIC, forecasted demand units under expected weather"),
            ("metric_nrm", "NUMERIC, forecasted demand units under normal weather"),
            ("metric_ly", "NUMERIC, demand units for the same week last year"),
        ],
    },
    TableDoc {
        name: "batches",
        description: "Received inventory batches.",
        columns: &[
            ("batch_id", "TEXT"),
            ("product_id", "TEXT"),
            ("store_id", "TEXT"),
            ("received_date", "DATE"),
            ("expiry_date", "DATE"),
            ("quantity_received", "NUMERIC"),
        ],
    },
    TableDoc {
        name: "batch_stock_tracking",
        description: "Daily on-hand stock per batch.",
        columns: &[
            ("batch_id", "TEXT, joins batches.batch_id"),
            ("date", "DATE"),
            ("quantity_on_hand", "NUMERIC, remaining units in the batch"),
        ],
    },
    TableDoc {
        name: "spoilage_report",
        description: "Recorded spoilage per store, product and day.",
        columns: &[
            ("store_id", "TEXT"),
            ("product_id", "TEXT"),
            ("date", "DATE"),
            ("spoiled_units", "NUMERIC"),
            ("spoilage_value", "NUMERIC, monetary value of spoiled units"),
        ],
    },
    TableDoc {
        name: "events",
        description: "Local events near stores (festivals, games, concerts).",
        columns: &[
            ("event_id", "TEXT"),
            ("event_name", "TEXT"),
            ("event_type", "TEXT"),
            ("market", "TEXT, joins location.market"),
            ("start_date", "DATE"),
            ("end_date", "DATE"),
            ("expected_attendance", "NUMERIC"),
        ],
    },
    TableDoc {
        name: "weekly_weather",
        description: "Weekly weather summary per store; join on week_end_date.",
        columns: &[
            ("store_id", "TEXT"),
            ("week_end_date", "DATE, join key against metrics.week_end_date"),
            ("avg_temperature", "NUMERIC, degrees Fahrenheit"),
            ("total_precipitation", "NUMERIC, inches"),
            ("condition", "TEXT, e.g. 'sunny', 'rain', 'snow'"),
        ],
    },
    TableDoc {
        name: "location",
        description: "Store directory.",
        columns: &[
            ("store_id", "TEXT"),
            ("store_name", "TEXT"),
            ("city", "TEXT"),
            ("state", "TEXT, two-letter code"),
            ("region", "TEXT, lowercase: 'northeast', 'southeast', 'midwest', 'west', 'southwest'"),
            ("market", "TEXT, metro market name"),
        ],
    },
    TableDoc {
        name: "product_hierarchy",
        description: "Product directory with category rollup.",
        columns: &[
            ("product_id", "TEXT"),
            ("product_name", "TEXT"),
            ("category", "TEXT"),
            ("department", "TEXT"),
        ],
    },
    TableDoc {
        name: "calendar",
        description: "Date dimension.",
        columns: &[
            ("date", "DATE"),
            ("week_end_date", "DATE, last day of the week containing this date"),
            ("month", "TEXT, full month name such as 'January' (not a number)"),
            ("quarter", "TEXT, e.g. 'Q1'"),
            ("year", "INTEGER"),
            ("is_holiday", "BOOLEAN"),
        ],
    },
    TableDoc {
        name: "perishable",
        description: "Shelf life for perishable products.",
        columns: &[
            ("product_id", "TEXT"),
            ("shelf_life_days", "INTEGER"),
        ],
    },
];

pub const MANDATORY_RULES: &[&str] = &[
    "Revenue is always SUM(sales_units * total_amount); never use total_amount alone as revenue.",
    "calendar.month holds full month names as text ('January'), never month numbers.",
    "location.region values are lowercase: 'northeast', 'southeast', 'midwest', 'west', 'southwest'.",
    "Wrap every divisor in NULLIF(..., 0) to avoid division by zero.",
    "Filter on raw columns in WHERE; filter on aggregates only in HAVING.",
    "Join weekly_weather to metrics on store_id and week_end_date.",
    "Join sales to calendar on date, to location on store_id, to product_hierarchy on product_id.",
];

pub fn render_schema() -> String {
    let mut out = String::new();
    for table in SCHEMA_CATALOG {
        out.push_str(&format!("TABLE {} -- {}\n", table.name, table.description));
        for (column, note) in table.columns {
            out.push_str(&format!("  {column}: {note}\n"));
        }
        out.push('\n');
    }
    out
}

pub fn render_rules() -> String {
    MANDATORY_RULES
        .iter()
        .enumerate()
        .map(|(i, rule)| format!("{}. {}\n", i + 1, rule))
        .collect()
}
