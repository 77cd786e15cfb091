use anyhow::Result;
use async_trait::async_trait;

use crate::card::{Deck, NewDeck};

use super::DB;

/// Document store seam for generated decks.
#[async_trait]
pub trait DeckStore: Send + Sync {
    /// Writes the deck and all of its cards, or nothing at all.
    async fn insert_deck(&self, deck: NewDeck) -> Result<Deck>;
}

#[async_trait]
impl DeckStore for DB {
    async fn insert_deck(&self, deck: NewDeck) -> Result<Deck> {
        let mut tx = self.pool.begin().await?;

        let deck_id =
            sqlx::query("INSERT INTO decks (owner_id, topic, created_at) VALUES (?, ?, ?)")
                .bind(deck.owner_id)
                .bind(&deck.topic)
                .bind(deck.created_at)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

        for (position, card) in deck.cards.iter().enumerate() {
            sqlx::query(
                r#"
            INSERT INTO cards (deck_id, position, question, answer)
            VALUES (?, ?, ?, ?)
            "#,
            )
            .bind(deck_id)
            .bind(position as i64)
            .bind(&card.question)
            .bind(&card.answer)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Deck {
            id: deck_id,
            owner_id: deck.owner_id,
            topic: deck.topic,
            created_at: deck.created_at,
            cards: deck.cards,
        })
    }
}

#[cfg(test)]
impl DB {
    pub async fn decks_for_owner(&self, owner_id: i64) -> Result<Vec<Deck>> {
        use chrono::{DateTime, Utc};
        use futures::TryStreamExt;
        use sqlx::Row;

        use crate::card::Card;

        let mut decks = Vec::new();
        let mut rows = sqlx::query(
            "SELECT id, topic, created_at FROM decks WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch(&self.pool);

        while let Some(row) = rows.try_next().await? {
            let created_at: DateTime<Utc> = row.try_get("created_at")?;
            decks.push(Deck {
                id: row.try_get("id")?,
                owner_id,
                topic: row.try_get("topic")?,
                created_at,
                cards: Vec::new(),
            });
        }
        drop(rows);

        for deck in &mut decks {
            let cards = sqlx::query(
                "SELECT question, answer FROM cards WHERE deck_id = ? ORDER BY position",
            )
            .bind(deck.id)
            .fetch_all(&self.pool)
            .await?;
            deck.cards = cards
                .into_iter()
                .map(|row| -> Result<Card> {
                    Ok(Card {
                        question: row.try_get("question")?,
                        answer: row.try_get("answer")?,
                    })
                })
                .collect::<Result<_>>()?;
        }

        Ok(decks)
    }

    pub async fn count_decks(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM decks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
