// Column metadata for the case and opportunity tables.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Date,
    Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearStyle {
    Numeric,
    TwoDigit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthStyle {
    Long,
    Short,
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStyle {
    Numeric,
    TwoDigit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub year: YearStyle,
    pub month: MonthStyle,
    pub day: DayStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeAttributes {
    None,
    Date(DateParts),
    Currency {
        currency_code: &'static str,
        fraction_digits: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub label: &'static str,
    pub field_name: &'static str,
    pub column_type: ColumnType,
    pub sortable: bool,
    pub wrap_text: bool,
    pub type_attributes: TypeAttributes,
}

impl ColumnSpec {
    const fn text(label: &'static str, field_name: &'static str) -> Self {
        Self {
            label,
            field_name,
            column_type: ColumnType::Text,
            sortable: true,
            wrap_text: false,
            type_attributes: TypeAttributes::None,
        }
    }

    const fn date(label: &'static str, field_name: &'static str, parts: DateParts) -> Self {
        Self {
            label,
            field_name,
            column_type: ColumnType::Date,
            sortable: true,
            wrap_text: false,
            type_attributes: TypeAttributes::Date(parts),
        }
    }

    const fn wrapped(mut self) -> Self {
        self.wrap_text = true;
        self
    }
}

pub const CASE_CREATED_DATE: &str = "CreatedDate";
pub const OPPORTUNITY_CLOSE_DATE: &str = "CloseDate";

/// Long month, 2-digit day, numeric year.
pub const CASE_DATE_PARTS: DateParts = DateParts {
    year: YearStyle::Numeric,
    month: MonthStyle::Long,
    day: DayStyle::TwoDigit,
};

/// Long month, numeric day, numeric year. Used when pre-formatting
/// opportunity close dates.
pub const CLOSE_DATE_PARTS: DateParts = DateParts {
    year: YearStyle::Numeric,
    month: MonthStyle::Long,
    day: DayStyle::Numeric,
};

pub const CASE_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec::text("Sujet", "Subject").wrapped(),
    ColumnSpec::text("Statut", "Status"),
    ColumnSpec::text("Priorité", "Priority"),
    ColumnSpec::date("Date de création", CASE_CREATED_DATE, CASE_DATE_PARTS),
];

pub const OPPORTUNITY_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec::text("Nom", "Name"),
    ColumnSpec {
        label: "Montant",
        field_name: "Amount",
        column_type: ColumnType::Currency,
        sortable: true,
        wrap_text: false,
        type_attributes: TypeAttributes::Currency {
            currency_code: "EUR",
            fraction_digits: 2,
        },
    },
    ColumnSpec::date("Date de clôture", OPPORTUNITY_CLOSE_DATE, CLOSE_DATE_PARTS),
    ColumnSpec::text("Phase", "StageName"),
];
