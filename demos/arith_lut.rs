//! Arithmetic lookup table example.
//!
//! Builds a 24x24 table of sums, differences, products and quotients with
//! one reused insert statement, probes it with a reused parameterized
//! select, lists a generated `SELECT`, and deletes a row with a generated
//! `DELETE`.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p stmtwrap-demos --example arith_lut
//! ```

use stmtwrap_sqlite::{Connection, params};

const SIZE: i64 = 24;

fn main() {
    // === Step 1: Create the table ===
    let conn = Connection::open_in_memory().unwrap();
    conn.execute(
        "CREATE TABLE Arith_LUT (
            X INTEGER NOT NULL,
            Y INTEGER NOT NULL,
            Sum  INTEGER NOT NULL,
            Diff INTEGER NOT NULL,
            Prod INTEGER NOT NULL,
            Quot REAL);",
    )
    .unwrap();

    // === Step 2: Fill it through one prepared insert ===
    let mut insert = conn
        .prepare("INSERT INTO Arith_LUT (X,Y,Sum,Diff,Prod,Quot) VALUES (?,?,?,?,?,?)")
        .unwrap();
    for x in 0..SIZE {
        for y in 0..SIZE {
            // The engine stores 0/0 (NaN) as NULL and x/0 as infinity.
            let quot = x as f64 / y as f64;
            insert
                .execute(params![x, y, x + y, x - y, (x * y) as f64, quot])
                .unwrap();
        }
    }
    drop(insert);
    println!("Inserted {} rows", SIZE * SIZE);

    // === Step 3: Probe pseudo-random keys ===
    println!("\n=== Lookups ===");
    let mut select = conn
        .prepare("SELECT * FROM Arith_LUT WHERE X=? AND Y=?")
        .unwrap();
    let mut probes = Lcg(2024);
    for _ in 0..32 {
        let x = probes.next_in(10, SIZE);
        let y = probes.next_in(10, SIZE);

        let rows = select.query(params![x, y]).unwrap();
        let row = rows.current_row();
        if row.is_active() {
            println!(
                "{x}+{y}={} \t{x}-{y}={} \t{x}*{y}={} \t{x}/{y}={}",
                row.read::<i32>(2),
                row.read::<i32>(3),
                row.read::<i32>(4),
                row.read::<f32>(5),
            );
        }
    }

    // === Step 4: List a generated SELECT ===
    println!("\n=== X=12 ===");
    let mut by_x = conn.make_select("Arith_LUT", None, Some("X=12")).unwrap();
    println!(
        "{:>6}{:>6}{:>6}{:>6}{:>6}{:>12}",
        "X", "Y", "Sum", "Diff", "Prod", "Quot"
    );
    let mut rows = by_x.query(params![]).unwrap();
    while let Some(row) = rows.next_row().unwrap() {
        println!(
            "{:>6}{:>6}{:>6}{:>6}{:>6}{:>12}",
            row.read::<i32>(0),
            row.read::<i32>(1),
            row.read::<i32>(2),
            row.read::<i32>(3),
            row.read::<i32>(4),
            row.read::<f32>(5),
        );
    }
    drop(rows);

    // === Step 5: Delete through a generated DELETE ===
    let mut delete = conn.make_delete("Arith_LUT", "X=0 AND Y=0").unwrap();
    delete.execute(params![]).unwrap();

    let mut count = conn.prepare("SELECT count(*) FROM Arith_LUT").unwrap();
    let remaining = count.query(params![]).unwrap().current_row().read_integer(0);
    println!("\nRows after delete: {remaining}");
}

/// Small linear congruential generator so the demo output is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_in(&mut self, low: i64, high: i64) -> i64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let span = (high - low) as u64;
        low + ((self.0 >> 33) % span) as i64
    }
}
