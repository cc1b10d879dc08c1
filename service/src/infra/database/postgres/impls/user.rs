//! [`User`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{self, Postgres},
        Database,
    },
};

/// Columns of the `users` table, in the order [`user_from_row()`] expects.
const COLUMNS: &str = "\
    id, nni, name, \
    password_hash, role, \
    address, job, domain, cv, photo, \
    created_at";

/// Reads a [`User`] from the provided [`Row`] selected with [`COLUMNS`].
fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        nni: row.get("nni"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        address: row.get("address"),
        job: row.get("job"),
        domain: row.get("domain"),
        cv: row.get("cv"),
        photo: row.get("photo"),
        created_at: row.get("created_at"),
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Postgres {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: user::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE id = $1::UUID \
             LIMIT 1",
        );
        Ok(self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(user_from_row))
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Nni>>> for Postgres {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Nni>>,
    ) -> Result<Self::Ok, Self::Err> {
        let nni = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE nni = $1::VARCHAR \
             LIMIT 1",
        );
        Ok(self
            .query_opt(sql.as_str(), &[&nni])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(user_from_row))
    }
}

impl Database<Insert<User>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            nni,
            name,
            password_hash,
            role,
            address,
            job,
            domain,
            cv,
            photo,
            created_at,
        } = user;

        // No `ON CONFLICT` clause: the `users_nni_key` violation is reported
        // to the caller.
        const SQL: &str = "\
            INSERT INTO users (\
                id, nni, name, \
                password_hash, role, \
                address, job, domain, cv, photo, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, \
                $4::VARCHAR, $5::VARCHAR, \
                $6::VARCHAR, $7::VARCHAR, $8::VARCHAR, \
                $9::VARCHAR, $10::VARCHAR, \
                $11::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &nni,
                &name,
                &password_hash,
                &role,
                &address,
                &job,
                &domain,
                &cv,
                &photo,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
