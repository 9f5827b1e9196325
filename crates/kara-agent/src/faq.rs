// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned answers for recurring questions.
//!
//! A query that mentions one of the topic keywords is answered from the
//! table and never reaches the chat provider. Lookups are memoized by a
//! SHA-256 of the normalized query.

use dashmap::DashMap;
use kara_catalog::fold;
use sha2::{Digest, Sha256};

/// Topics with a canned answer, in match priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaqTopic {
    Shipping,
    PaymentMethods,
    Returns,
    SizingHelp,
    StockInquiry,
}

const TOPICS: [FaqTopic; 5] = [
    FaqTopic::Shipping,
    FaqTopic::PaymentMethods,
    FaqTopic::Returns,
    FaqTopic::SizingHelp,
    FaqTopic::StockInquiry,
];

impl FaqTopic {
    /// Phrases matched on word boundaries of the accent-folded query.
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Shipping => &[
                "envio", "envios", "envian", "hacen envios", "costo de envio", "todo el pais",
                "despachan", "correo argentino", "andreani",
            ],
            Self::PaymentMethods => &[
                "medios de pago", "medio de pago", "formas de pago", "forma de pago",
                "mercado pago", "mercadopago", "transferencia", "tarjeta de credito",
                "tarjeta de debito", "como pago", "como se paga",
            ],
            Self::Returns => &[
                "devolucion", "devoluciones", "devolver", "cambio de talle", "cambios",
                "reembolso", "garantia",
            ],
            Self::SizingHelp => &[
                "guia de talles", "tabla de talles", "tabla de medidas", "que talle me",
                "como elijo el talle", "como se el talle",
            ],
            Self::StockInquiry => &[
                "cuando reponen", "cuando vuelve", "vuelven a entrar", "reposicion",
                "avisame cuando", "avisan cuando",
            ],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::PaymentMethods => "payment_methods",
            Self::Returns => "returns",
            Self::SizingHelp => "sizing_help",
            Self::StockInquiry => "stock_inquiry",
        }
    }

    /// The canned reply, signed with the store name.
    pub fn answer(self, store_name: &str) -> String {
        let body = match self {
            Self::Shipping => {
                "¡Hola! Sí, hacemos envíos a todo el país.\n\n\
                 - CABA y GBA: 24 a 72 hs hábiles.\n\
                 - Resto del país: 3 a 7 días hábiles por correo.\n\
                 - Envío gratis en compras superiores a $80.000.\n\n\
                 Cuando se despacha tu pedido te enviamos el código de seguimiento por mail."
            }
            Self::PaymentMethods => {
                "¡Hola! Aceptamos:\n\n\
                 - Tarjetas de crédito y débito (hasta 3 cuotas sin interés).\n\
                 - Mercado Pago.\n\
                 - Transferencia bancaria con 10% de descuento.\n\n\
                 El pago se confirma al finalizar la compra en la web."
            }
            Self::Returns => {
                "¡Hola! Tenés 30 días desde que recibís el pedido para cambios o devoluciones.\n\n\
                 - La prenda tiene que estar sin uso y con etiqueta.\n\
                 - El primer cambio de talle es sin cargo.\n\
                 - Si preferís la devolución, reintegramos el dinero por el mismo medio de pago.\n\n\
                 Respondé este mail con tu número de orden y te guiamos."
            }
            Self::SizingHelp => {
                "¡Hola! Nuestra guía de talles:\n\n\
                 - S: pecho 96 cm, largo 70 cm.\n\
                 - M: pecho 102 cm, largo 72 cm.\n\
                 - L: pecho 108 cm, largo 74 cm.\n\
                 - XL: pecho 114 cm, largo 76 cm.\n\n\
                 Si estás entre dos talles, te recomendamos el más grande para un calce relajado."
            }
            Self::StockInquiry => {
                "¡Hola! Reponemos stock todas las semanas.\n\n\
                 Si un talle o color figura agotado, respondé este mail con el nombre del producto \
                 y te avisamos apenas vuelva a entrar."
            }
        };
        format!("{body}\n\n{store_name}")
    }
}

/// A canned reply chosen for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqHit {
    pub topic: FaqTopic,
    pub answer: String,
}

/// Memo entries kept before an arbitrary entry is evicted per insert.
pub const DEFAULT_MEMO_CAPACITY: usize = 1024;

/// Keyword-matched FAQ table with a bounded memo of past lookups.
pub struct FaqCache {
    store_name: String,
    memo: DashMap<String, Option<FaqTopic>>,
    capacity: usize,
}

impl FaqCache {
    pub fn new(store_name: impl Into<String>) -> Self {
        Self::with_capacity(store_name, DEFAULT_MEMO_CAPACITY)
    }

    pub fn with_capacity(store_name: impl Into<String>, capacity: usize) -> Self {
        Self {
            store_name: store_name.into(),
            memo: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Returns the canned reply for `query`, if any topic matches.
    pub fn lookup(&self, query: &str) -> Option<FaqHit> {
        let normalized = normalize(query);
        let key = cache_key(&normalized);

        let cached = self.memo.get(&key).map(|entry| *entry);
        let topic = match cached {
            Some(topic) => topic,
            None => {
                let topic = match_topic(&normalized);
                self.remember(key, topic);
                topic
            }
        };

        topic.map(|topic| FaqHit {
            topic,
            answer: topic.answer(&self.store_name),
        })
    }

    fn remember(&self, key: String, topic: Option<FaqTopic>) {
        if self.memo.len() >= self.capacity {
            let victim = self.memo.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.memo.remove(&victim);
            }
        }
        self.memo.insert(key, topic);
    }

    /// Number of memoized queries, never more than the capacity.
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

/// Folds accents and case, keeps alphanumeric words separated by single spaces.
fn normalize(query: &str) -> String {
    fold(query)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn cache_key(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

fn match_topic(normalized: &str) -> Option<FaqTopic> {
    let padded = format!(" {normalized} ");
    TOPICS.into_iter().find(|topic| {
        topic
            .keywords()
            .iter()
            .any(|keyword| padded.contains(&format!(" {keyword} ")))
    })
}
