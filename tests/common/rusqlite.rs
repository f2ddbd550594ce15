use rowshape::sqlite::SqliteConnection;

const SCHEMA: &str = "
    CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER NOT NULL);
    CREATE TABLE class (id INTEGER PRIMARY KEY, person_id INTEGER NOT NULL REFERENCES person(id), title TEXT NOT NULL);
    CREATE TABLE address (person_id INTEGER NOT NULL REFERENCES person(id), city TEXT NOT NULL);
";

const SEED: &str = "
    INSERT INTO person (id, name, age) VALUES (1, 'John', 30), (2, 'Mary', 25);
    INSERT INTO class (id, person_id, title) VALUES (1, 1, 'Math'), (2, 1, 'Art'), (3, 2, 'Physics');
    INSERT INTO address (person_id, city) VALUES (1, 'Oslo');
";

pub fn setup_db() -> SqliteConnection {
    let db = SqliteConnection::open_in_memory().expect("Failed to create in-memory database");
    db.execute_batch(SCHEMA).expect("Failed to create tables");
    db.execute_batch(SEED).expect("Failed to seed tables");
    db
}
