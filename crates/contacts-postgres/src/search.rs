//! Renders a [`Predicate`] into SQL with bound parameters.
//!
//! Substring terms use `strpos(column, $n) > 0`: case-sensitive, and `%`
//! or `_` in user input stay literal.

use sqlx::{Postgres, QueryBuilder};

use contacts_core::query::{PhoneMatch, Predicate};

pub(crate) const PERSON_COLUMNS: &str =
    "p.id, p.first_name, p.last_name, p.date_of_birth, p.email, p.created_at, p.updated_at";

/// `SELECT <person columns> FROM person p WHERE <predicate> ORDER BY p.id`
pub(crate) fn person_search_query(predicate: &Predicate) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {PERSON_COLUMNS} FROM person p WHERE "));
    push_predicate(&mut qb, predicate);
    qb.push(" ORDER BY p.id");
    qb
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::All(terms) => push_joined(qb, terms, " AND ", "TRUE"),
        Predicate::Any(terms) => push_joined(qb, terms, " OR ", "FALSE"),
        Predicate::Contains(column, needle) => {
            qb.push("strpos(p.")
                .push(column.column_name())
                .push(", ")
                .push_bind(needle.clone())
                .push(") > 0");
        }
        Predicate::BornOn(date) => {
            qb.push("p.date_of_birth = ").push_bind(*date);
        }
        Predicate::HasPhone(m) => push_phone_exists(qb, m),
    }
}

fn push_joined(
    qb: &mut QueryBuilder<'static, Postgres>,
    terms: &[Predicate],
    separator: &str,
    empty: &str,
) {
    if terms.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_predicate(qb, term);
    }
    qb.push(")");
}

/// One correlated sub-select, so every condition binds to the same phone row.
fn push_phone_exists(qb: &mut QueryBuilder<'static, Postgres>, m: &PhoneMatch) {
    qb.push(
        "EXISTS (SELECT 1 FROM phone ph JOIN phone_type pt ON pt.id = ph.phone_type_id \
         WHERE ph.person_id = p.id",
    );
    if let Some(number) = &m.number_contains {
        qb.push(" AND strpos(ph.number, ")
            .push_bind(number.clone())
            .push(") > 0");
    }
    if let Some(type_name) = &m.type_name {
        qb.push(" AND pt.type_name = ").push_bind(type_name.clone());
    }
    qb.push(")");
}
